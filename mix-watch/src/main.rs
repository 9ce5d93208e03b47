#![cfg_attr(not(windows), allow(dead_code))]

use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod watch;

use config::Args;

fn init_logging(args: &Args) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&args.log_level)
            .with_context(|| format!("Invalid log level: {}", args.log_level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &args.log_file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(?e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(windows)]
mod source {
    use anyhow::{Context, Result};
    use wave_format::endpoint::DefaultRenderEndpoint;

    use crate::watch::{FormatSource, Observation};

    /// Re-resolves the default render device on every read so that switching
    /// the system output is picked up.
    pub struct DefaultEndpointSource {
        pub show_device: bool,
    }

    impl FormatSource for DefaultEndpointSource {
        fn current(&mut self) -> Result<Observation> {
            let endpoint =
                DefaultRenderEndpoint::open().context("Failed to open default output device")?;
            let descriptor = endpoint
                .mix_format()
                .context("Failed to read mix format")?;

            let device_id = if self.show_device {
                Some(endpoint.id().context("Failed to read device id")?)
            } else {
                None
            };

            Ok(Observation {
                descriptor,
                device_id,
            })
        }
    }
}

#[cfg(windows)]
async fn watch_default_endpoint(args: Args) -> Result<()> {
    use std::time::Duration;

    use wave_format::endpoint::ComApartment;
    use watch::{FormatSource, Watcher};

    let _com = ComApartment::init().context("Failed to initialize COM")?;

    let mut source = source::DefaultEndpointSource {
        show_device: args.show_device,
    };

    if args.once {
        println!("{}", source.current()?);
        return Ok(());
    }

    tracing::info!(interval_ms = args.interval_ms, "Watching default output device");

    let mut watcher = Watcher::new(source);
    watch::run(
        &mut watcher,
        Duration::from_millis(args.interval_ms),
        ctrl_c(),
        &mut std::io::stdout(),
    )
    .await
}

#[cfg(not(windows))]
async fn watch_default_endpoint(_args: Args) -> Result<()> {
    anyhow::bail!("Reading the device mix format requires WASAPI, which is only available on Windows")
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    // COM interfaces stay on the thread that created them.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(watch_default_endpoint(args))
}
