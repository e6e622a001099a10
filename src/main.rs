//! CLI entry point for quire

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quire::commands::list::ListKind;
use quire::Site;

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "A static site builder for markdown post corpora", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site
    #[command(alias = "b")]
    Build {
        /// Content directory
        content: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Config file (defaults to _config.yml in the content directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory of layouts overriding the built-in ones
        #[arg(short, long)]
        layouts: Option<PathBuf>,

        /// Posts per listing page
        #[arg(long)]
        page_size: Option<usize>,

        /// Number of posts in the feed
        #[arg(long)]
        feed_len: Option<usize>,

        /// Worker threads (defaults to the number of cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Empty the output directory first
        #[arg(long)]
        clean: bool,
    },

    /// List site content
    List {
        /// Content directory
        content: PathBuf,

        /// Type of content to list (post, tag)
        #[arg(short, long, default_value = "post")]
        r#type: ListKind,

        /// Config file (defaults to _config.yml in the content directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Create a new post
    New {
        /// Content directory
        content: PathBuf,

        /// Title of the new post
        title: String,

        /// Create a bundle directory instead of a single file
        #[arg(short, long)]
        bundle: bool,
    },

    /// Remove the output directory
    Clean {
        /// Output directory
        output: PathBuf,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug { "quire=debug,info" } else { "quire=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build {
            content,
            output,
            config,
            layouts,
            page_size,
            feed_len,
            jobs,
            clean,
        } => {
            let mut site = Site::new(&content, &output, config.as_deref())?.with_layouts_dir(layouts);
            if let Some(n) = page_size {
                site.config.per_page = n;
            }
            if let Some(n) = feed_len {
                site.config.feed_limit = n;
            }
            if jobs.is_some() {
                site.config.jobs = jobs;
            }

            quire::commands::build::run(&site, clean).await?;
        }

        Commands::List {
            content,
            r#type,
            config,
            json,
        } => {
            let site = Site::new(&content, content.join("public"), config.as_deref())?;
            quire::commands::list::run(&site, r#type, json)?;
        }

        Commands::New {
            content,
            title,
            bundle,
        } => {
            let site = Site::new(&content, content.join("public"), None)?;
            tracing::info!("Creating new post with title: {}", title);
            site.new_post(&title, bundle)?;
        }

        Commands::Clean { output } => {
            tracing::info!("Cleaning {:?}", output);
            quire::commands::clean::run(&output)?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("quire version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
