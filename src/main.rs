// src/main.rs
use anyhow::Context;
use clap::Parser;
use gaudimon::cli::{Args, OutputFormat, USAGE_HINT};
use gaudimon::collector::{Collector, local_hostname};
use gaudimon::exec::SystemRunner;
use gaudimon::render;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries nothing but the document. `RUST_LOG`
/// directives are layered on top of the -v level.
fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("gaudimon={}", args.log_level()).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if std::env::args().len() <= 1 {
        println!("{USAGE_HINT}");
        return Ok(());
    }

    let args = Args::parse();
    init_logging(&args)?;
    warn!("---- START (version {}) ----", env!("CARGO_PKG_VERSION"));

    let plan = args.plan();
    if plan.is_empty() {
        info!("no collection selected, reporting discovered devices only");
    }

    let collector = Collector::new(SystemRunner).with_sysfs_root(&args.sysfs_root);
    let host = collector.run(&local_hostname(), &plan).await;

    match args.output_format {
        OutputFormat::Dict => {
            info!("printing host as JSON");
            println!("{}", render::dump(&host));
        }
        OutputFormat::InfluxdbLp => {
            info!("printing output in InfluxDB line protocol format");
            print!("{}", render::render(&host));
        }
    }

    warn!("---------- END ----------");
    Ok(())
}
