use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use termshift_core::{ScanOptions, ScanRequest};

mod commands;
mod core;

use commands::GlobalOptions;

#[derive(Parser)]
#[command(name = "termshift")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Context-aware find and replace across structured content records",
    long_about = "Scans content records for a term, previews structure-preserving rewrites \
                  of plain text, rich-text trees and links, and applies the ones you select."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text, markdown)
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Config file to use instead of ./termshift.toml and the global config
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Work against a JSON snapshot file instead of the management API
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Stack API key (defaults to TERMSHIFT_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// User auth token (defaults to TERMSHIFT_AUTHTOKEN)
    #[arg(long, global = true)]
    authtoken: Option<String>,

    /// Stack management token (defaults to TERMSHIFT_MANAGEMENT_TOKEN)
    #[arg(long, global = true)]
    management_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan records for a term and preview the proposed replacements
    Scan {
        /// Term to find
        #[arg(long)]
        find: String,

        /// Replacement term
        #[arg(long)]
        replace: String,

        /// Record types to scan (defaults to all)
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Keep version numbers and editions when the find term is a versioned product
        #[arg(long)]
        context_aware: bool,

        /// Rewrite link targets as well as link text
        #[arg(long)]
        update_links: bool,

        /// Keep emails and URLs that embed the term consistent
        #[arg(long)]
        named_entities: bool,

        /// Also detect people and organizations from capitalized phrases (with --named-entities)
        #[arg(long, requires = "named_entities")]
        heuristic: bool,

        /// Validate the replacement against this brand kit first
        #[arg(long)]
        brand_kit: Option<String>,

        /// Locale to scan (defaults to the configured locale)
        #[arg(short, long)]
        locale: Option<String>,

        /// Save the full scan response for a later `apply`
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Apply selected results from a saved scan
    Apply {
        /// Scan response saved with `scan --save`
        #[arg(short, long)]
        report: PathBuf,

        /// Record ids to apply
        #[arg(long)]
        select: Vec<String>,

        /// Apply every result in the report
        #[arg(long, conflicts_with = "select")]
        all: bool,

        /// User id recorded in audit entries
        #[arg(long)]
        user_id: Option<String>,
    },

    /// List record types
    Types,

    /// Show how a find term is classified
    Classify {
        /// Term to classify
        term: String,
    },

    /// Extract entities from a piece of text
    Entities {
        /// Text to analyze
        text: String,

        /// Also detect capitalized phrases as people and organizations
        #[arg(long)]
        heuristic: bool,
    },

    /// Write a default config file
    ConfigInit {
        /// Where to write the file
        #[arg(short, long, default_value = "termshift.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("termshift=debug,termshift_core=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("termshift=info,termshift_core=info")
            .with_writer(std::io::stderr)
            .init();
    }

    let global = GlobalOptions {
        format: cli.format,
        config: cli.config,
        snapshot: cli.snapshot,
        api_key: cli.api_key,
        authtoken: cli.authtoken,
        management_token: cli.management_token,
    };

    match cli.command {
        Commands::Scan {
            find,
            replace,
            types,
            context_aware,
            update_links,
            named_entities,
            heuristic,
            brand_kit,
            locale,
            save,
        } => {
            let mut request = ScanRequest::new(find, replace)
                .with_content_types(types)
                .with_options(ScanOptions {
                    context_aware,
                    update_links,
                    named_entities,
                    use_brandkit: brand_kit.is_some(),
                });
            request.brand_kit_id = brand_kit;
            request.locale = locale;

            commands::scan::run(request, heuristic, save, &global).await?
        }
        Commands::Apply {
            report,
            select,
            all,
            user_id,
        } => commands::apply::run(report, select, all, user_id, &global).await?,
        Commands::Types => commands::types::run(&global).await?,
        Commands::Classify { term } => commands::classify::run(term, &global.format)?,
        Commands::Entities { text, heuristic } => {
            commands::entities::run(text, heuristic, &global.format)?
        }
        Commands::ConfigInit { path, force } => commands::config_init::run(path, force)?,
    }

    Ok(())
}
