use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use clap::builder::TypedValueParser;
use tracing::{debug, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod dataset;
mod detail;
mod domain;
mod filter;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use dataset::Dataset;
use domain::{DEFAULT_PAGE_SIZE, DVConfig, DVError};
use filter::ColumnSpec;
use model::{Model, Status};
use ui::TableUI;

/// Filterable terminal viewer for deal tables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Data file to show (csv, parquet or arrow)
    #[arg(default_value = "data/deals.csv")]
    path: String,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u16).range(1..).map(|v| v as usize))]
    page_size: usize,

    /// Override the filter of a column, e.g. "Deal type=equals".
    /// Kinds: none, equals, between, threshold (or ">"), checkbox, contains
    #[arg(long = "filter", value_name = "COLUMN=KIND")]
    filters: Vec<String>,

    /// File receiving the log output, filtered by RUST_LOG
    #[arg(long, default_value = "dealview.log")]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, DVError> {
    shellexpand::full(path)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| DVError::InvalidPath(format!("{path}: {e}")))
}

fn init_logging(path: &Path) -> Result<(), DVError> {
    let file = File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

// Expects logging to be set up, malformed overrides are only reported there.
fn build_config(args: &Args) -> Result<DVConfig, DVError> {
    let mut columns = DVConfig::default().columns;
    for raw in args.filters.iter() {
        match ColumnSpec::parse(raw) {
            Some(spec) => match columns.iter_mut().find(|c| c.id == spec.id) {
                Some(column) => column.kind = spec.kind,
                None => columns.push(spec),
            },
            None => warn!("Ignoring malformed filter option \"{raw}\""),
        }
    }

    Ok(DVConfig::default()
        .data_path(expand_path(&args.path)?)
        .log_file(expand_path(&args.log_file)?)
        .event_poll_time(args.poll_ms)
        .page_size(args.page_size)
        .columns(columns))
}

fn run(args: Args) -> Result<(), DVError> {
    init_logging(&expand_path(&args.log_file)?)?;
    let cfg = build_config(&args)?;
    info!("Starting dealview, logging to {}", cfg.log_file.display());
    debug!("Config {:?}", cfg);

    let dataset = Dataset::load(cfg.data_path.clone())?;
    let mut model = Model::init(&cfg, dataset);
    let ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        let message = controller.handle_event(&model)?;
        model.update(message);
    }
    info!("Bye");

    Ok(())
}
