use env_logger::Env;
use log::{debug, error, info};
use sensorlog_lpp::chart::{NoChart, SvgChart};
use sensorlog_lpp::parse::RowParser;
use sensorlog_lpp::plot::parse_cli;
use sensorlog_lpp::tail::LogTail;
use sensorlog_lpp::tail::LivePlot;
use sensorlog_lpp::ColumnSeries;

fn main() {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = match args.parser_config() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if args.normalize != "none" {
        debug!("normalize '{}' is passed through, values are plotted as parsed", args.normalize);
    }

    let tail = match LogTail::open(&args.logfile, args.from_start) {
        Ok(t) => t,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let series = ColumnSeries::new(&config.x_column, &config.y_columns, args.window());
    let parser = RowParser::new(config);
    let result = if args.list_columns {
        LivePlot::new(tail, parser, series, NoChart).run()
    } else {
        let title = args
            .logfile
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!(
            "read data from {} and plot {} column(s) to {}",
            args.logfile.display(),
            series.y.len(),
            args.svgout.display()
        );
        let chart = SvgChart::new(args.svgout.clone(), &title, args.refresh);
        LivePlot::new(tail, parser, series, chart).run()
    };

    match result {
        Ok(columns) => {
            for c in columns.iter() {
                println!("{}", c);
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
