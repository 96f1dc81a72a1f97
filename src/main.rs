//! # docview CLI
//!
//! The `docview` binary resolves and renders documents held by an ACI
//! search backend, either one at a time from the command line or through
//! the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docview --config ./config/docview.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docview view <reference>` | Render a document to stdout or a file |
//! | `docview resolve <reference>` | Show which view strategy applies, without rendering |
//! | `docview promotion <reference>` | View a static content promotion (unsupported) |
//! | `docview serve` | Start the HTTP server |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=docview=debug`) to
//! adjust verbosity.

use anyhow::Context;
use clap::{Parser, Subcommand};
use docview::config::{self, ConfigProvider, FileConfigProvider};
use docview::view::ResolvedView;
use docview_core::models::{ViewOptions, ViewRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

/// docview: resolve search-backend document references into rendered views.
#[derive(Parser)]
#[command(name = "docview", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docview.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document.
    ///
    /// Writes the rendered bytes to stdout, or to `--output` if given.
    View {
        /// Document reference.
        reference: String,

        /// Database the document lives in.
        #[arg(long, default_value = "")]
        database: String,

        /// Terms to highlight (repeatable).
        #[arg(long)]
        highlight: Vec<String>,

        /// Output type passed to the view server.
        #[arg(long)]
        output_type: Option<String>,

        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show how a document would be rendered.
    Resolve {
        /// Document reference.
        reference: String,

        /// Database the document lives in.
        #[arg(long, default_value = "")]
        database: String,
    },

    /// View a static content promotion.
    Promotion {
        /// Promotion reference.
        reference: String,
    },

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docview=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let provider: Arc<dyn ConfigProvider> =
        Arc::new(FileConfigProvider::with_initial(&cli.config, cfg.view.clone()));
    let service = Arc::new(docview::build_service(&cfg, provider)?);

    match cli.command {
        Commands::View {
            reference,
            database,
            highlight,
            output_type,
            output,
        } => {
            let request = ViewRequest::new(reference, database).with_options(ViewOptions {
                highlight_expressions: highlight,
                output_type,
                ..Default::default()
            });

            let written = match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let written = service.view_document(&request, &mut file).await?;
                    file.sync_all().await?;
                    written
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    let written = service.view_document(&request, &mut stdout).await?;
                    stdout.flush().await?;
                    written
                }
            };
            tracing::info!(reference = %request.reference, written, "document rendered");
        }
        Commands::Resolve {
            reference,
            database,
        } => {
            let request = ViewRequest::new(reference, database);
            match service.resolve(&request).await? {
                ResolvedView::ViewServer { reference, request } => {
                    println!("reference: {}", reference);
                    println!("strategy:  view_server");
                    println!("url:       {}", request.get("Reference").unwrap_or(""));
                }
                ResolvedView::RawContent(doc) => {
                    println!("reference: {}", doc.reference);
                    println!("strategy:  raw_content");
                    println!("title:     {}", doc.title.as_deref().unwrap_or("(untitled)"));
                    println!("content:   {} bytes", doc.content.len());
                }
            }
        }
        Commands::Promotion { reference } => {
            let mut stdout = tokio::io::stdout();
            service
                .view_static_content_promotion(&reference, &mut stdout)
                .await?;
        }
        Commands::Serve => {
            docview::server::run_server(&cfg.server.bind, service).await?;
        }
    }

    Ok(())
}
