use super::{DEFAULT_Y_COLUMNS, TS_COLUMN, VERSION};
use crate::parse::ParserConfig;
use clap::{App, Arg, ArgMatches};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no y columns provided")]
    NoYColumns,
    #[error("invalid value '{value}' for --{arg}")]
    InvalidValue { arg: &'static str, value: String },
}

/// The CLI arguments of the live plot.
#[derive(Debug, Clone)]
pub struct LivePlotArgs {
    pub logfile: PathBuf,
    pub svgout: PathBuf,
    pub x_column: String,
    pub y_columns: String,
    pub window: i64,
    pub from_start: bool,
    pub list_columns: bool,
    pub normalize: String,
    pub refresh: Duration,
    pub verbose: bool,
}

impl LivePlotArgs {
    /// the rolling window, `None` for a non-positive size
    pub fn window(&self) -> Option<usize> {
        if self.window <= 0 {
            None
        } else {
            Some(self.window as usize)
        }
    }

    /// Builds the parser configuration,
    /// the y columns are trimmed and the duplicates dropped keeping the first occurrence.
    pub fn parser_config(&self) -> Result<ParserConfig, ConfigError> {
        let mut y_columns: Vec<String> = Vec::new();
        for c in self.y_columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if !y_columns.iter().any(|u| u == c) {
                y_columns.push(c.to_string());
            }
        }
        if y_columns.is_empty() {
            return Err(ConfigError::NoYColumns);
        }
        Ok(ParserConfig {
            x_column: self.x_column.clone(),
            y_columns,
            list_columns: self.list_columns,
        })
    }
}

fn cli_app<'a, 'b>() -> App<'a, 'b> {
    let arg_logfile = Arg::with_name("logfile")
        .help("path to the RTT log file")
        .short("f")
        .long("file")
        .takes_value(true)
        .required(true);
    let arg_x = Arg::with_name("x_column")
        .help("x column, ts_ns is plotted as seconds since the first row")
        .short("x")
        .long("x")
        .takes_value(true)
        .default_value(TS_COLUMN);
    let arg_y = Arg::with_name("y_columns")
        .help("comma separated y columns, one panel each")
        .short("y")
        .long("y")
        .takes_value(true)
        .default_value(DEFAULT_Y_COLUMNS);
    let arg_window = Arg::with_name("window")
        .help("max number of points to keep, 0 for unlimited")
        .short("w")
        .long("window")
        .takes_value(true)
        .allow_hyphen_values(true)
        .default_value("600");
    let arg_from_start = Arg::with_name("from_start")
        .help("parse from the beginning of the file (default tails from the end)")
        .long("from-start")
        .takes_value(false);
    let arg_list_cols = Arg::with_name("list_cols")
        .help("print the detected columns then exit")
        .long("list-cols")
        .takes_value(false);
    let arg_normalize = Arg::with_name("normalize")
        .help("normalization of the y values")
        .long("normalize")
        .takes_value(true)
        .default_value("none");
    let arg_svgout = Arg::with_name("output_svgfile")
        .help("name of the output svg file, rewritten at each refresh")
        .short("o")
        .long("svgfile")
        .takes_value(true);
    let arg_refresh = Arg::with_name("refresh_ms")
        .help("minimum interval between two renders, in milliseconds")
        .long("refresh_ms")
        .takes_value(true)
        .default_value("200");
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false)
        .required(false);
    App::new("Sensorlog_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to live plot the sensor rows of a device log")
        .arg(arg_logfile)
        .arg(arg_x)
        .arg(arg_y)
        .arg(arg_window)
        .arg(arg_from_start)
        .arg(arg_list_cols)
        .arg(arg_normalize)
        .arg(arg_svgout)
        .arg(arg_refresh)
        .arg(arg_verbose)
}

fn args_from_matches(cli_args: &ArgMatches) -> Result<LivePlotArgs, ConfigError> {
    let logfile = PathBuf::from(cli_args.value_of("logfile").unwrap_or_default());
    let svgout = match cli_args.value_of("output_svgfile") {
        Some(p) => PathBuf::from(p),
        None => {
            let mut svgout = logfile.clone();
            svgout.set_extension("svg");
            svgout
        }
    };
    let val_window = cli_args.value_of("window").unwrap_or_default();
    let window = val_window
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidValue {
            arg: "window",
            value: val_window.to_string(),
        })?;
    let val_refresh = cli_args.value_of("refresh_ms").unwrap_or_default();
    let refresh_ms = val_refresh
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue {
            arg: "refresh_ms",
            value: val_refresh.to_string(),
        })?;
    Ok(LivePlotArgs {
        logfile,
        svgout,
        x_column: String::from(cli_args.value_of("x_column").unwrap_or(TS_COLUMN)),
        y_columns: String::from(cli_args.value_of("y_columns").unwrap_or(DEFAULT_Y_COLUMNS)),
        window,
        from_start: cli_args.is_present("from_start"),
        list_columns: cli_args.is_present("list_cols"),
        normalize: String::from(cli_args.value_of("normalize").unwrap_or("none")),
        refresh: Duration::from_millis(refresh_ms),
        verbose: cli_args.is_present("verbose"),
    })
}

/// Takes the CLI arguments that control the live plot.
pub fn parse_cli() -> Result<LivePlotArgs, ConfigError> {
    let cli_args = cli_app().get_matches();
    args_from_matches(&cli_args)
}

/// same as `parse_cli`, from an explicit argument list
pub fn parse_cli_from<I, T>(args: I) -> Result<LivePlotArgs, Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli_args = cli_app().get_matches_from_safe(args)?;
    Ok(args_from_matches(&cli_args)?)
}
