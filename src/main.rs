use std::{io, process::ExitCode};

use clap::Parser;
use imu_heading::{
    Result,
    config::{Options, ReadMode},
    decoder::{HeadingFeed, LineDecoder},
    render::{ArrowSet, DisplaySurface, GENERATED_ARROW_SIZE, SnapshotDisplay, TerminalDisplay},
    serial::{self, HeadingWorker},
    viewer::Viewer,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let options = Options::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.verbosity.as_deref().unwrap_or("info")));
    tracing_subscriber::fmt::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_writer(io::stderr)
        .init();

    info!("\x1b[93mIMU heading viewer\x1b[0m \x1b[92minitalized.\x1b[0m");

    match run(&options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(options: &Options) -> Result<()> {
    let arrows = match &options.assets {
        Some(dir) => ArrowSet::load(dir)?,
        None => ArrowSet::generated(GENERATED_ARROW_SIZE),
    };

    let port = serial::open(&options.serial())?;
    let feed: Box<dyn HeadingFeed> = match options.mode {
        ReadMode::Poll => Box::new(LineDecoder::new(port)),
        ReadMode::Worker => Box::new(HeadingWorker::spawn(port)?),
    };
    info!("Reading headings in {:?} mode", options.mode);

    let terminal = TerminalDisplay::new(io::stdout().lock(), options.output);
    let display: Box<dyn DisplaySurface> = match &options.snapshot {
        Some(path) => {
            info!("Saving snapshots to {}", path.display());
            Box::new(SnapshotDisplay::new(terminal, path, options.theme))
        }
        None => Box::new(terminal),
    };
    let mut viewer = Viewer::new(feed, arrows, display);

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                let _ = stop.send(true);
            }
            Err(e) => {
                warn!("Cannot listen for Ctrl-C, running until the device fails: {e}");
                // Keep the sender alive so the loop is not stopped.
                std::future::pending::<()>().await;
                drop(stop);
            }
        }
    });

    viewer.run(options.tick(), shutdown).await
}
