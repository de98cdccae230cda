//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use logtree_core::{serialize_dir, SerializeOptions};
use logtree_server::{LogTreeServer, ServerConfig};
use logtree_watcher::{WatchConfig, WatchTask};
use std::fs;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Serve the tree over HTTP while watching it for changes.
pub async fn serve(
    root: &Path,
    addr: SocketAddr,
    poll_interval: Duration,
    options: SerializeOptions,
) -> Result<()> {
    println!("{}", "Starting logtree...".cyan());
    println!("  Monitoring log directory: {}", root.display());
    println!("  Listening on port: {}", addr.port());

    // The watcher runs on its own; if it can't start, the server still does.
    let watch = WatchTask::spawn(WatchConfig {
        root: root.to_path_buf(),
        poll_interval,
    });

    let config = ServerConfig {
        addr,
        root: root.to_path_buf(),
        options,
    };
    let server = LogTreeServer::new(config);

    println!("{} Serving http://{}/", "✓".green(), addr);
    println!("  Press {} to stop", "Ctrl+C".cyan());

    let served = server.run_until(shutdown_signal()).await;

    // Watcher errors were already logged by the task.
    if let Err(e) = watch.close().await {
        debug!("Watcher ended with: {}", e);
    }

    served?;
    println!("{} Stopped", "✓".green());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Write the tree as JSON to `output`, or stdout if none is given.
pub fn export(root: &Path, output: Option<&Path>, options: SerializeOptions) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Reading {}...", root.display()));

    let json = serialize_dir(root, options);
    spinner.finish_and_clear();
    let json = json?;

    match output {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!(
                "{} Exported {} bytes to {}",
                "✓".green(),
                json.len().to_string().cyan(),
                path.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&json)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
    }

    Ok(())
}
