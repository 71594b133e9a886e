use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colstore::{
    append_outputs, extreme_values, DiskStore, EnhancedDiskStore, ExtremeValues, MemoryStore,
    Output, RowBatch, Schema, Store, Value,
};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Disk,
    Enhanced,
}

/// Load weather readings into a column store and report the monthly
/// temperature and humidity extremes of one station.
#[derive(Debug, Parser)]
#[command(name = "colstore", version)]
struct Args {
    /// Comma-separated readings with a header line
    #[arg(long, env = "COLSTORE_CSV")]
    csv: PathBuf,

    /// Root directory for disk backends
    #[arg(long, env = "COLSTORE_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Backend::Enhanced)]
    backend: Backend,

    #[arg(long, default_value = "Paya Lebar")]
    station: String,

    /// Years to analyse, e.g. `2009,2019`
    #[arg(long, value_delimiter = ',', required = true)]
    year: Vec<i16>,

    /// Result file, appended to
    #[arg(long, default_value = "ScanResult.csv")]
    output: PathBuf,

    /// Print the first N cells of every column after loading
    #[arg(long)]
    head: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("colstore=info".parse().expect("static directive")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(written) => {
            info!(output = %args.output.display(), rows = written, "analysis complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "analysis failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> colstore::Result<usize> {
    let batch = RowBatch::from_path(&args.csv)?;
    match args.backend {
        Backend::Memory => process(MemoryStore::new(Schema::weather()), &batch, args, |s, year, station| {
            extreme_values(s, year, station)
        }),
        Backend::Disk => process(
            DiskStore::create(&args.data_dir, Schema::weather())?,
            &batch,
            args,
            |s, year, station| extreme_values(s, year, station),
        ),
        Backend::Enhanced => process(
            EnhancedDiskStore::create(&args.data_dir, Schema::weather())?,
            &batch,
            args,
            |s, year, station| s.extreme_values(year, station),
        ),
    }
}

fn process<S: Store>(
    mut store: S,
    batch: &RowBatch,
    args: &Args,
    analyse: impl Fn(&S, i16, &str) -> Vec<Output>,
) -> colstore::Result<usize> {
    let rows = store.ingest(batch)?;
    info!(backend = store.name(), rows, "loaded");

    if let Some(n) = args.head {
        for (name, cells) in store.head(n) {
            let cells: Vec<String> = cells
                .iter()
                .map(|c| c.as_ref().map_or_else(|| "M".to_string(), Value::to_string))
                .collect();
            println!("{name}: {}", cells.join(", "));
        }
    }

    let mut written = 0;
    for &year in &args.year {
        let outputs = analyse(&store, year, &args.station);
        info!(year, station = %args.station, outputs = outputs.len(), "year analysed");
        append_outputs(&args.output, &outputs)?;
        written += outputs.len();
    }
    Ok(written)
}
