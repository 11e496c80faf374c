use rolling::RollingSeries;
pub mod chart;
pub mod extract;
pub mod parse;
pub mod plot;
pub mod rolling;
pub mod tail;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const INF_MARKER: &str = "<inf>";
pub const APP_MODULE: &str = "app:";
pub const HEADER_SENTINEL: &str = "ts_ns,";
pub const FIELD_SEPARATOR: char = ',';

/// timestamp column, in nanoseconds; plotted as seconds since the first row
pub const TS_COLUMN: &str = "ts_ns";
pub const TS_LABEL: &str = "t_s";

pub const DEFAULT_Y_COLUMNS: &str =
    "temp_comp_c,hum_comp_rh,gas_raw_ohm,co2_eq_ppm,breath_voc_eq_ppm,gas_pct,iaq_acc";

/// The rolling series of the plotted columns:
/// one for the x axis and one per requested y column, all with the same window.
#[derive(Debug, Clone)]
pub struct ColumnSeries {
    pub x_label: String,
    pub x: RollingSeries,
    pub y: Vec<(String, RollingSeries)>,
}

impl ColumnSeries {
    pub fn new(x_column: &str, y_columns: &[String], window: Option<usize>) -> ColumnSeries {
        let x_label = if x_column == TS_COLUMN {
            TS_LABEL.to_string()
        } else {
            x_column.to_string()
        };
        let y = y_columns
            .iter()
            .map(|c| (c.clone(), RollingSeries::new(window)))
            .collect();
        ColumnSeries {
            x_label,
            x: RollingSeries::new(window),
            y,
        }
    }

    /// Appends one resolved row, `ys` follows the order of the y columns.
    pub fn push_row(&mut self, x: f64, ys: &[f64]) {
        debug_assert_eq!(ys.len(), self.y.len(), "one value per y column");
        self.x.push(x);
        for ((_, series), &v) in self.y.iter_mut().zip(ys.iter()) {
            series.push(v);
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn y_series(&self, name: &str) -> Option<&RollingSeries> {
        self.y.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }
}

impl std::fmt::Display for ColumnSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.x_label)?;
        for (name, _) in self.y.iter() {
            write!(f, ",{}", name)?;
        }
        writeln!(f)?;
        let mut y_iters: Vec<_> = self.y.iter().map(|(_, s)| s.iter()).collect();
        for x in self.x.iter() {
            write!(f, "{}", x)?;
            for it in y_iters.iter_mut() {
                match it.next() {
                    Some(v) => write!(f, ",{}", v)?,
                    None => write!(f, ",")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// min and max of the finite values, `None` if there are none
pub fn min_and_max<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let mut finite = values.into_iter().filter(|v| v.is_finite());
    let (mut min, mut max) = match finite.next() {
        Some(v) => (v, v),
        None => return None,
    };
    for v in finite {
        if v > max {
            max = v
        }
        if v < min {
            min = v
        }
    }
    Some((min, max))
}

/// widens a degenerate range so that it can be drawn
pub fn padded_range(min: f64, max: f64, fraction: f64) -> (f64, f64) {
    if max > min {
        let margin = (max - min) * fraction;
        (min - margin, max + margin)
    } else {
        let margin = if min == 0. { 1. } else { min.abs() * fraction.max(0.01) };
        (min - margin, max + margin)
    }
}
