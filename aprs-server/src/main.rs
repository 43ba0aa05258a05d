//! aprs-server: CLI + daemon for APRS station tracking.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{error, info, warn};

use aprs_core::config::{self, Config, DEFAULT_CONFIG_FILE};
use aprs_core::{Position, RadiusMode, StationContext};

mod capture;
mod gpsd;
mod web;

use capture::CaptureFormat;

#[derive(Parser)]
#[command(name = "sbaprs", version, about = "APRS packet decoder and station graph")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file and print a heard table
    Decode {
        /// Capture file, or `-` for stdin
        file: PathBuf,

        /// Print every decoded packet instead of the summary table
        #[arg(short, long)]
        raw: bool,

        /// Input is an APRS-IS dump rather than kissutil output
        #[arg(long)]
        aprs_is: bool,

        /// Local callsign used as the receiving end of relay chains
        #[arg(long, default_value = "NOCALL")]
        mycall: String,
    },

    /// Build the station graph from a capture file and print it as DOT
    Graph {
        /// Capture file, or `-` for stdin
        file: PathBuf,

        /// Local callsign used as the receiving end of relay chains
        #[arg(long, default_value = "NOCALL")]
        mycall: String,

        /// Input is an APRS-IS dump rather than kissutil output
        #[arg(long)]
        aprs_is: bool,
    },

    /// Run the station daemon: ingest DATAFILE or follow the FIFO
    Serve {
        /// Config file path
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Take the local position from gpsd
        #[arg(short, long)]
        gpsd: bool,

        /// Start the HTTP status API
        #[arg(short, long)]
        web: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Decode {
            file,
            raw,
            aprs_is,
            mycall,
        } => cmd_decode(&file, raw, format_for(aprs_is), mycall),
        Commands::Graph {
            file,
            mycall,
            aprs_is,
        } => cmd_graph(&file, format_for(aprs_is), mycall),
        Commands::Serve { config, gpsd, web } => cmd_serve(&config, gpsd, web),
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn format_for(aprs_is: bool) -> CaptureFormat {
    if aprs_is {
        CaptureFormat::AprsIs
    } else {
        CaptureFormat::Kissutil
    }
}

fn open_input(file: &Path) -> Box<dyn BufRead> {
    if file.to_str() == Some("-") {
        return Box::new(io::stdin().lock());
    }
    let f = std::fs::File::open(file).unwrap_or_else(|e| {
        error!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    });
    Box::new(io::BufReader::new(f))
}

fn cmd_decode(file: &Path, raw: bool, format: CaptureFormat, mycall: String) {
    let station = StationContext::new(mycall, Position::default(), RadiusMode::Miles);
    let mut summary = capture::CaptureSummary::default();

    for line in open_input(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "unreadable line skipped");
                summary.lines += 1;
                summary.errors += 1;
                continue;
            }
        };
        if let Some(packet) = capture::ingest_one(&station, &line, format, &mut summary) {
            if raw {
                println!("{packet:?}");
            }
        }
    }

    if !raw {
        print_summary(&station, &summary);
    }
}

fn cmd_graph(file: &Path, format: CaptureFormat, mycall: String) {
    let station = StationContext::new(mycall, Position::default(), RadiusMode::Miles);
    if let Err(e) = capture::ingest_reader(&station, open_input(file), format) {
        error!("Error reading {}: {e}", file.display());
        std::process::exit(1);
    }
    println!("{}", station.graph().output_graph());
}

fn cmd_serve(config_path: &Path, gpsd: bool, web: bool) {
    let mut config = config::load_config(config_path).unwrap_or_else(|e| {
        error!("Error loading config {}: {e}", config_path.display());
        std::process::exit(1);
    });
    config.gpsd.enabled |= gpsd;

    let station = Arc::new(StationContext::new(
        config.station.call.clone(),
        config.position(),
        config.units,
    ));

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        error!("Error starting runtime: {e}");
        std::process::exit(1);
    });

    runtime.block_on(run_daemon(config, station, web));
}

async fn run_daemon(config: Config, station: Arc<StationContext>, web: bool) {
    if config.gpsd.enabled {
        match gpsd::fetch_position(&config.gpsd.addr).await {
            Ok(pos) => station.set_position(pos),
            Err(e) => warn!(error = %e, "gpsd unavailable, keeping configured position"),
        }
    }

    info!(call = station.my_call(), position = %station.position(), "starting station");

    let api = web.then(|| {
        let station = Arc::clone(&station);
        let (host, port) = (config.api.host.clone(), config.api.port);
        tokio::spawn(async move {
            if let Err(e) = web::serve(station, host, port).await {
                error!(error = %e, "API server stopped");
            }
        })
    });

    let ingest = {
        let station = Arc::clone(&station);
        let input = config.input.clone();
        tokio::task::spawn_blocking(move || match &input.data_file {
            Some(path) => {
                capture::read_capture(&station, Path::new(path), CaptureFormat::Kissutil).map(|_| ())
            }
            None => capture::follow_fifo(&station, Path::new(&input.fifo), CaptureFormat::Kissutil),
        })
    };

    match ingest.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "ingestion failed"),
        Err(e) => error!(error = %e, "ingestion task panicked"),
    }

    let stats = station.stats();
    info!(
        lines = stats.lines,
        decoded = stats.decoded,
        errors = stats.errors,
        stations = station.heard_count(),
        edges = station.graph().edge_count(),
        "ingestion finished"
    );

    // Keep answering API requests after a capture file has been read.
    if let Some(api) = api {
        tokio::select! {
            _ = api => {}
            _ = tokio::signal::ctrl_c() => info!("shutting down"),
        }
    }
}

fn print_summary(station: &StationContext, summary: &capture::CaptureSummary) {
    println!();
    println!(
        "Lines: {} read, {} decoded, {} errors, {} stations, {} edges",
        summary.lines,
        summary.decoded,
        summary.errors,
        station.heard_count(),
        station.graph().edge_count()
    );
    println!();

    let heard = station.heard();
    if heard.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Station", "Packets", "Last heard", "Distance"]);

    for h in heard {
        table.add_row(vec![
            Cell::new(&h.call),
            Cell::new(h.packets),
            Cell::new(web::routes::format_time(h.last_heard)),
            Cell::new(
                h.distance
                    .map(|d| format!("{d:.2} {}", station.radius_mode().unit()))
                    .unwrap_or("-".into()),
            ),
        ]);
    }

    println!("{table}");
}
