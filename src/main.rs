use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use watchrun::{
    cli::Cli,
    config::save_config,
    core::DirectoryScanner,
    exec::ShellRunner,
    watcher::{StopFlag, WatchError, WatchLoop},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();

    let config = match cli.to_config() {
        Ok(config) => Arc::new(config),
        Err(err) => exit_with(WatchError::from(err)),
    };

    if let Some(path) = &cli.save_config {
        if let Err(err) = save_config(&config, path) {
            exit_with(WatchError::from(err));
        }
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let stop = StopFlag::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping watcher...");
        handler_stop.request_stop();
    })?;

    tracing::debug!(?config, "starting watch loop");

    let mut watch_loop = WatchLoop::new(
        Arc::clone(&config),
        DirectoryScanner::new(),
        ShellRunner::from_config(&config),
        stop,
    );

    if let Err(err) = watch_loop.run().await {
        exit_with(err);
    }

    Ok(())
}

fn exit_with(err: WatchError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(err.exit_code());
}
