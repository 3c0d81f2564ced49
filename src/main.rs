//! CLI entry point for quire

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire::server::ServeOptions;
use quire::{BuildMode, Site};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "A static blog builder for Markdown posts", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render all published documents to the public directory
    #[command(aliases = ["generate", "g"])]
    Build,

    /// Build and serve the site locally
    #[command(alias = "s")]
    Serve {
        /// Include drafts (local addresses only)
        #[arg(long)]
        draft: bool,

        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Disable file watching and live reload
        #[arg(long)]
        r#static: bool,
    },

    /// Create a new document (a draft unless --publish is given)
    New {
        /// Title of the new document
        title: String,

        /// File path under the content directory, without extension
        #[arg(short, long)]
        path: Option<String>,

        /// Create the document as published
        #[arg(long)]
        publish: bool,
    },

    /// List documents and the ones that fail to load
    List,

    /// Remove the public directory
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "quire=debug,info"
    } else {
        "quire=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Build => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Building {:?}", site.content_dir);

            let report = site.build(BuildMode::Publish)?;
            if !report.is_clean() {
                for failure in &report.failures {
                    eprintln!("error: {}", failure);
                }
                anyhow::bail!(
                    "{} document(s) failed; {} page(s) were written",
                    report.failures.len(),
                    report.pages
                );
            }
            println!("Built {} pages.", report.pages);
        }

        Commands::Serve {
            draft,
            port,
            ip,
            open,
            r#static,
        } => {
            let site = Site::new(&base_dir)?;
            let mode = if draft {
                BuildMode::Preview
            } else {
                BuildMode::Publish
            };
            let options = ServeOptions {
                ip,
                port,
                watch: !r#static,
                open,
                mode,
            };
            quire::server::start(&site, options).await?;
        }

        Commands::New {
            title,
            path,
            publish,
        } => {
            let site = Site::new(&base_dir)?;
            let file =
                quire::commands::new::create_document(&site, &title, path.as_deref(), publish)?;
            println!("Created: {}", file.display());
        }

        Commands::List => {
            let site = Site::new(&base_dir)?;
            quire::commands::list::run(&site)?;
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("quire version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
