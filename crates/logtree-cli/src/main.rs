//! Logtree CLI - serve a directory as JSON
//!
//! Serves the contents of a directory tree (by default `/var/log`) as a
//! single JSON document and logs changes to the tree as they happen.

use clap::{Parser, Subcommand};
use colored::Colorize;
use logtree_core::{SerializeOptions, Utf8Policy};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "logtree")]
#[command(author = "Logtree Contributors")]
#[command(version)]
#[command(about = "Serve a directory tree as JSON and watch it for changes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the directory as JSON and log changes to it
    Serve {
        /// Directory to serve and watch
        #[arg(long, default_value = "/var/log")]
        logdir: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,

        /// Milliseconds between two scans of the tree
        #[arg(long, default_value = "100")]
        poll_ms: u64,

        /// Fail requests when a file isn't valid UTF-8
        #[arg(long)]
        strict_utf8: bool,
    },

    /// Write the directory as JSON to a file or stdout
    Export {
        /// Directory to export
        #[arg(long, default_value = "/var/log")]
        logdir: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON
        #[arg(long)]
        pretty: bool,

        /// Fail when a file isn't valid UTF-8
        #[arg(long)]
        strict_utf8: bool,
    },
}

fn utf8_policy(strict: bool) -> Utf8Policy {
    if strict {
        Utf8Policy::Strict
    } else {
        Utf8Policy::Lossy
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `export` can write JSON to stdout.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Serve {
            logdir,
            port,
            bind,
            poll_ms,
            strict_utf8,
        } => {
            let options = SerializeOptions {
                utf8: utf8_policy(strict_utf8),
                pretty: false,
            };
            commands::serve(
                &logdir,
                SocketAddr::new(bind, port),
                Duration::from_millis(poll_ms),
                options,
            )
            .await
        }
        Commands::Export {
            logdir,
            output,
            pretty,
            strict_utf8,
        } => {
            let options = SerializeOptions {
                utf8: utf8_policy(strict_utf8),
                pretty,
            };
            commands::export(&logdir, output.as_deref(), options)
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
