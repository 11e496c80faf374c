use crate::{min_and_max, padded_range, ColumnSeries, DT_FORMAT};
use chrono::prelude::*;
use log::debug;
use plotters::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const PANEL_WIDTH: u32 = 1100;
const PANEL_HEIGHT: u32 = 170;

/// Where the rolling series are drawn.
pub trait ChartSurface {
    /// called after each appended row
    fn refresh(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>>;

    /// called when the log has no more lines, before the idle wait
    fn idle(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
        self.refresh(series)
    }
}

/// Draws nothing, for when only the columns are listed.
pub struct NoChart;

impl ChartSurface for NoChart {
    fn refresh(&mut self, _series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// Limits how often the chart is rendered,
/// a refresh within `min_interval` of the last render only marks the chart as dirty.
#[derive(Debug, Clone)]
pub struct RefreshThrottle {
    min_interval: Duration,
    last_render: Option<Instant>,
    dirty: bool,
}

impl RefreshThrottle {
    pub fn new(min_interval: Duration) -> Self {
        RefreshThrottle {
            min_interval,
            last_render: None,
            // draw the empty panels on the first idle
            dirty: true,
        }
    }

    pub fn mark(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn due(&self, now: Instant) -> bool {
        self.dirty
            && match self.last_render {
                Some(t) => now.saturating_duration_since(t) >= self.min_interval,
                None => true,
            }
    }

    pub fn rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
        self.dirty = false;
    }
}

/// Live chart rewritten as an svg file, one panel per y column, sharing the x axis.
/// Keep it open in a viewer that reloads on change.
pub struct SvgChart {
    path: PathBuf,
    title: String,
    throttle: RefreshThrottle,
}

impl SvgChart {
    pub fn new(path: PathBuf, title: &str, min_interval: Duration) -> SvgChart {
        SvgChart {
            path,
            title: title.to_string(),
            throttle: RefreshThrottle::new(min_interval),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render_if_due(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
        let now = Instant::now();
        if !self.throttle.due(now) {
            return Ok(());
        }
        let caption = format!(
            "{}, {} samples, updated {}",
            self.title,
            series.len(),
            Local::now().format(DT_FORMAT)
        );
        // render next to the target and rename, viewers never see a partial file
        let tmp = self.path.with_extension("svg.tmp");
        plot_series(series, &tmp, &caption)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("rendered {} samples to {}", series.len(), self.path.display());
        self.throttle.rendered(now);
        Ok(())
    }
}

impl ChartSurface for SvgChart {
    fn refresh(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
        self.throttle.mark();
        self.render_if_due(series)
    }

    fn idle(&mut self, series: &ColumnSeries) -> Result<(), Box<dyn Error>> {
        self.render_if_due(series)
    }
}

/// x limits follow the retained samples
pub fn x_range(series: &ColumnSeries) -> (f64, f64) {
    match min_and_max(series.x.iter()) {
        Some((min, max)) if max > min => (min, max),
        Some((min, _)) => (min, min + 1.),
        None => (0., 1.),
    }
}

/// y limits of one panel, scaled on its own samples
pub fn y_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    match min_and_max(values) {
        Some((min, max)) => padded_range(min, max, 0.1),
        None => (-1., 1.),
    }
}

/// plots the rolling series to svg, the NAN samples leave a gap in the line
pub fn plot_series(series: &ColumnSeries, fout: &Path, caption: &str) -> Result<(), Box<dyn Error>> {
    let n_panels = series.y.len().max(1);
    let height = PANEL_HEIGHT * n_panels as u32 + 60;
    let root = SVGBackend::new(fout, (PANEL_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(caption, ("sans-serif", 18))?;
    let panels = root.split_evenly((n_panels, 1));
    let (xmin, xmax) = x_range(series);
    let x_fmt = |x: &f64| format!("{:.1}", x);
    let y_fmt = |y: &f64| format!("{:8.2}", y);

    for (i, ((name, ys), area)) in series.y.iter().zip(panels.iter()).enumerate() {
        let last = i + 1 == series.y.len();
        let (ymin, ymax) = y_range(ys.iter());
        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .x_label_area_size(if last { 40 } else { 20 })
            .y_label_area_size(90)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)?;
        let mut mesh = chart.configure_mesh();
        mesh.light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(150, 150, 150).stroke_width(1))
            .set_all_tick_mark_size(2)
            .label_style(("sans-serif", 14))
            .y_desc(name.as_str())
            .y_labels(5)
            .x_labels(12) // max number of labels
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt);
        if last {
            mesh.x_desc(series.x_label.as_str());
        }
        mesh.draw()?;

        let points: Vec<(f64, f64)> = series.x.iter().zip(ys.iter()).collect();
        for segment in points.split(|(_, y)| y.is_nan()) {
            if segment.is_empty() {
                continue;
            }
            let line = LineSeries::new(segment.iter().copied(), Palette99::pick(i).stroke_width(2));
            chart.draw_series(line)?;
        }
    }
    root.present()?;
    Ok(())
}
