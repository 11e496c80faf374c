use crate::extract::{is_header_start, is_number_row};
use crate::{ColumnSeries, FIELD_SEPARATOR, TS_COLUMN};
use log::warn;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Why a candidate data row was dropped.
/// None of these stop the stream, the row is skipped and the series are left untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("no header received yet")]
    NoHeader,
    #[error("row has {found} fields, header has {expected}")]
    FieldCount { expected: usize, found: usize },
    #[error("x column '{0}' is not in the header")]
    MissingXColumn(String),
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("invalid value '{value}' in column '{column}'")]
    Value { column: String, value: String },
}

/// What the parser did with one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// neither header related nor a data row
    Ignored,
    HeaderStarted,
    HeaderFragment,
    /// header finalized while listing columns, nothing else should be parsed
    ColumnsDetected(Vec<String>),
    Rejected(RowError),
    Appended,
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub x_column: String,
    pub y_columns: Vec<String>,
    pub list_columns: bool,
}

/// The mutable state of the reassembler, nothing else is kept between payloads.
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    pub pending_header: Option<String>,
    pub header: Option<Vec<String>>,
    pub column_index: HashMap<String, usize>,
    pub baseline_timestamp: Option<i64>,
    pub warned_missing: HashSet<String>,
}

impl ParserState {
    fn set_header(&mut self, columns: Vec<String>) {
        // with repeated names the last position wins
        self.column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.header = Some(columns);
    }

    fn append_fragment(&mut self, fragment: &str) {
        if let Some(pending) = self.pending_header.as_mut() {
            let trailing = pending.ends_with(FIELD_SEPARATOR);
            match fragment.strip_prefix(FIELD_SEPARATOR) {
                Some(rest) if trailing => pending.push_str(rest),
                Some(_) => pending.push_str(fragment),
                None => {
                    if !trailing {
                        pending.push(FIELD_SEPARATOR);
                    }
                    pending.push_str(fragment);
                }
            }
        }
    }
}

/// Rebuilds the header from the (possibly fragmented) payloads
/// and turns the following data rows into x and y samples.
pub struct RowParser {
    config: ParserConfig,
    state: ParserState,
}

impl RowParser {
    pub fn new(config: ParserConfig) -> RowParser {
        RowParser {
            config,
            state: ParserState::default(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.state.header.as_deref()
    }

    /// Processes one payload, appending to `series` only when the whole row resolves.
    pub fn feed(&mut self, payload: &str, series: &mut ColumnSeries) -> Outcome {
        let number_row = is_number_row(payload);
        let header_start = is_header_start(payload);

        if self.state.pending_header.is_some()
            && !number_row
            && payload.contains(FIELD_SEPARATOR)
            && !header_start
        {
            self.state.append_fragment(payload);
            return Outcome::HeaderFragment;
        }

        if header_start {
            self.state.pending_header = Some(payload.to_string());
            self.state.header = None;
            self.state.column_index.clear();
            return Outcome::HeaderStarted;
        }

        if self.state.header.is_none() && self.state.pending_header.is_none() {
            return Outcome::Ignored;
        }
        if !number_row {
            return Outcome::Ignored;
        }

        let parts: Vec<&str> = payload.split(FIELD_SEPARATOR).map(str::trim).collect();

        if let Some(pending) = self.state.pending_header.take() {
            let columns: Vec<String> = pending
                .split(FIELD_SEPARATOR)
                .map(|c| c.trim().to_string())
                .collect();
            self.state.set_header(columns);
            if self.config.list_columns {
                return Outcome::ColumnsDetected(self.state.header.clone().unwrap_or_default());
            }
            self.warn_missing_columns();
        }

        let n_columns = match &self.state.header {
            Some(h) => h.len(),
            None => return Outcome::Rejected(RowError::NoHeader),
        };
        if parts.len() != n_columns {
            return Outcome::Rejected(RowError::FieldCount {
                expected: n_columns,
                found: parts.len(),
            });
        }

        match self.resolve(&parts) {
            Ok((x, ys, baseline)) => {
                if self.state.baseline_timestamp.is_none() {
                    self.state.baseline_timestamp = baseline;
                }
                series.push_row(x, &ys);
                Outcome::Appended
            }
            Err(e) => Outcome::Rejected(e),
        }
    }

    fn warn_missing_columns(&mut self) {
        let requested = std::iter::once(&self.config.x_column).chain(self.config.y_columns.iter());
        for c in requested {
            if !self.state.column_index.contains_key(c) && self.state.warned_missing.insert(c.clone()) {
                warn!("requested column '{}' not in header", c);
            }
        }
    }

    /// Resolves x and every y of a row without touching the state,
    /// returning the baseline timestamp to keep if this is the first accepted row.
    fn resolve(&self, parts: &[&str]) -> Result<(f64, Vec<f64>, Option<i64>), RowError> {
        let x_column = &self.config.x_column;
        let x_token = match self.state.column_index.get(x_column) {
            Some(&i) => parts[i],
            None => return Err(RowError::MissingXColumn(x_column.clone())),
        };

        let (x, baseline) = if x_column == TS_COLUMN {
            let ts: i64 = x_token
                .parse()
                .map_err(|_| RowError::Timestamp(x_token.to_string()))?;
            let t0 = self.state.baseline_timestamp.unwrap_or(ts);
            let elapsed = (i128::from(ts) - i128::from(t0)) as f64 / 1e9;
            (elapsed, Some(t0))
        } else {
            let x: f64 = x_token.parse().map_err(|_| RowError::Value {
                column: x_column.clone(),
                value: x_token.to_string(),
            })?;
            (x, None)
        };

        let mut ys = Vec::with_capacity(self.config.y_columns.len());
        for c in self.config.y_columns.iter() {
            let y = match self.state.column_index.get(c) {
                Some(&i) => parts[i].parse().map_err(|_| RowError::Value {
                    column: c.clone(),
                    value: parts[i].to_string(),
                })?,
                None => f64::NAN,
            };
            ys.push(y);
        }
        Ok((x, ys, baseline))
    }
}
