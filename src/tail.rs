use crate::chart::ChartSurface;
use crate::extract::{decode_line, parse_app_inf_payload};
use crate::parse::{Outcome, RowParser};
use crate::ColumnSeries;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// wait when the log has no new lines
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TailError {
    #[error("could not open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read log file: {0}")]
    Read(#[from] std::io::Error),
}

/// Line reader over a log file that keeps growing.
/// Lines are returned only once terminated, an unterminated tail is kept until the writer completes it.
pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    partial: Vec<u8>,
    pos: u64,
}

impl LogTail {
    /// Opens the log, positioned at the end unless `from_start`.
    pub fn open(path: &Path, from_start: bool) -> Result<LogTail, TailError> {
        let file = File::open(path).map_err(|source| TailError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = BufReader::new(file);
        let pos = if from_start {
            0
        } else {
            reader.seek(SeekFrom::End(0))?
        };
        Ok(LogTail {
            path: path.to_path_buf(),
            reader,
            partial: Vec::new(),
            pos,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next complete line, `None` when nothing new is available yet.
    pub fn next_line(&mut self) -> Result<Option<String>, TailError> {
        let n = self.reader.read_until(b'\n', &mut self.partial)?;
        self.pos += n as u64;
        if n == 0 {
            self.rewind_if_truncated()?;
            return Ok(None);
        }
        if self.partial.last() != Some(&b'\n') {
            return Ok(None);
        }
        let line = decode_line(&self.partial);
        self.partial.clear();
        Ok(Some(line))
    }

    fn rewind_if_truncated(&mut self) -> Result<(), TailError> {
        let len = self.reader.get_ref().metadata()?.len();
        if len < self.pos {
            info!(
                "{} shrank from {} to {} bytes, reading from the start",
                self.path.display(),
                self.pos,
                len
            );
            self.reader.seek(SeekFrom::Start(0))?;
            self.partial.clear();
            self.pos = 0;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// all the available lines were processed
    Idle,
    /// columns detected in list mode, stop here
    Exit(Vec<String>),
}

/// Pulls lines from the log into the parser and redraws the chart.
pub struct LivePlot<C: ChartSurface> {
    tail: LogTail,
    parser: RowParser,
    series: ColumnSeries,
    chart: C,
}

impl<C: ChartSurface> LivePlot<C> {
    pub fn new(tail: LogTail, parser: RowParser, series: ColumnSeries, chart: C) -> Self {
        LivePlot {
            tail,
            parser,
            series,
            chart,
        }
    }

    pub fn series(&self) -> &ColumnSeries {
        &self.series
    }

    pub fn parser(&self) -> &RowParser {
        &self.parser
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    /// Processes every line available now, then redraws once more.
    pub fn step(&mut self) -> Result<Step, TailError> {
        while let Some(line) = self.tail.next_line()? {
            let payload = match parse_app_inf_payload(&line) {
                Some(p) => p,
                None => continue,
            };
            match self.parser.feed(payload, &mut self.series) {
                Outcome::Appended => {
                    if let Err(e) = self.chart.refresh(&self.series) {
                        warn!("could not refresh the chart: {}", e);
                    }
                }
                Outcome::ColumnsDetected(columns) => return Ok(Step::Exit(columns)),
                Outcome::Rejected(e) => debug!("skipping row '{}': {}", payload, e),
                _ => {}
            }
        }
        if let Err(e) = self.chart.idle(&self.series) {
            warn!("could not refresh the chart: {}", e);
        }
        Ok(Step::Idle)
    }

    /// Follows the log until the columns are listed, otherwise forever.
    pub fn run(&mut self) -> Result<Vec<String>, TailError> {
        loop {
            match self.step()? {
                Step::Exit(columns) => return Ok(columns),
                Step::Idle => std::thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParserConfig;
    use std::error::Error;
    use std::io::Write;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingChart {
        refreshes: Vec<usize>,
        idles: usize,
    }

    impl ChartSurface for RecordingChart {
        fn refresh(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
            self.refreshes.push(series.len());
            Ok(())
        }

        fn idle(&mut self, _series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
            self.idles += 1;
            Ok(())
        }
    }

    fn append(path: &Path, text: &[u8]) {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .unwrap();
        f.write_all(text).unwrap();
    }

    fn live_plot(path: &Path, from_start: bool, list_columns: bool) -> LivePlot<RecordingChart> {
        let y_columns = vec!["temp_c".to_string(), "hum_rh".to_string()];
        let series = ColumnSeries::new("ts_ns", &y_columns, Some(3));
        let parser = RowParser::new(ParserConfig {
            x_column: "ts_ns".to_string(),
            y_columns,
            list_columns,
        });
        let tail = LogTail::open(path, from_start).unwrap();
        LivePlot::new(tail, parser, series, RecordingChart::default())
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let res = LogTail::open(&dir.path().join("nope.log"), true);
        assert!(matches!(res, Err(TailError::Open { .. })));
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(&path, b"first\nsec");
        let mut tail = LogTail::open(&path, true).unwrap();
        assert_eq!(tail.next_line().unwrap(), Some("first".to_string()));
        assert_eq!(tail.next_line().unwrap(), None);
        append(&path, b"ond\r\n");
        assert_eq!(tail.next_line().unwrap(), Some("second".to_string()));
        assert_eq!(tail.next_line().unwrap(), None);
    }

    #[test]
    fn tail_skips_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(&path, b"old line\n");
        let mut tail = LogTail::open(&path, false).unwrap();
        assert_eq!(tail.next_line().unwrap(), None);
        append(&path, b"new line\n");
        assert_eq!(tail.next_line().unwrap(), Some("new line".to_string()));
    }

    #[test]
    fn truncated_log_is_read_again() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(&path, b"a long line before the reset\n");
        let mut tail = LogTail::open(&path, true).unwrap();
        assert!(tail.next_line().unwrap().is_some());
        std::fs::write(&path, b"").unwrap();
        assert_eq!(tail.next_line().unwrap(), None);
        append(&path, b"after\n");
        assert_eq!(tail.next_line().unwrap(), Some("after".to_string()));
    }

    #[test]
    fn step_parses_rows_and_redraws() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(
            &path,
            b"*** Booting Zephyr OS ***\n\
              [00:00:00.010,000] <inf> app: ts_ns,temp_c\n\
              [00:00:00.010,000] <inf> app: hum_rh\n\
              [00:00:00.011,000] <inf> app: ,gas_ohm\n\
              [00:00:01.000,000] <inf> app: 1000000000,21.0,40.0,1200\n\
              [00:00:01.500,000] <wrn> app: 1500000000,99.0,99.0,99\n\
              [00:00:02.000,000] <inf> app: 2000000000,21.5,41.0\n\
              \xff\xfe garbage\n\
              [00:00:03.000,000] <inf> app: 3000000000,22.0,42.0,1250\n",
        );
        let mut lp = live_plot(&path, true, false);
        assert_eq!(lp.step().unwrap(), Step::Idle);
        // "hum_rh" has no separator, so it is not part of the header
        let columns = lp.parser().columns().unwrap().to_vec();
        assert_eq!(columns, vec!["ts_ns", "temp_c", "gas_ohm"]);
        // only the row with three fields is kept, the baseline is its timestamp
        assert_eq!(lp.series().x.to_vec(), vec![0.0]);
        assert_eq!(lp.series().y_series("temp_c").unwrap().to_vec(), vec![21.5]);
        assert!(lp.series().y_series("hum_rh").unwrap().to_vec()[0].is_nan());
        assert_eq!(lp.chart().refreshes, vec![1]);
        assert_eq!(lp.chart().idles, 1);
    }

    #[test]
    fn step_follows_appended_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(&path, b"<inf> app: ts_ns,temp_c,hum_rh\n");
        let mut lp = live_plot(&path, true, false);
        assert_eq!(lp.step().unwrap(), Step::Idle);
        assert!(lp.series().is_empty());

        append(
            &path,
            b"<inf> app: 1000000000,21.0,40.0\n\
              <inf> app: 2000000000,21.5\n\
              <inf> app: 3000000000,22.0,42.0\n",
        );
        assert_eq!(lp.step().unwrap(), Step::Idle);
        assert_eq!(lp.series().x.to_vec(), vec![0.0, 2.0]);
        assert_eq!(lp.chart().refreshes, vec![1, 2]);

        append(
            &path,
            b"<inf> app: 4000000000,22.5,43.0\n\
              <inf> app: 5000000000,23.0,44.0\n",
        );
        assert_eq!(lp.step().unwrap(), Step::Idle);
        assert_eq!(lp.series().x.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(
            lp.series().y_series("hum_rh").unwrap().to_vec(),
            vec![42.0, 43.0, 44.0]
        );
        assert_eq!(lp.chart().refreshes, vec![1, 2, 3, 3]);
        assert_eq!(lp.chart().idles, 3);
    }

    #[test]
    fn list_columns_exits_before_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rtt.log");
        append(
            &path,
            b"<inf> app: ts_ns,temp_c,hum_rh\n\
              <inf> app: 1000000000,21.0,40.0\n\
              <inf> app: 2000000000,21.5,41.0\n",
        );
        let mut lp = live_plot(&path, true, true);
        let columns = lp.run().unwrap();
        assert_eq!(columns, vec!["ts_ns", "temp_c", "hum_rh"]);
        assert!(lp.series().is_empty());
        assert!(lp.chart().refreshes.is_empty());
    }
}
