pub mod analyze;
pub mod archetypes;
pub mod lookup;
pub mod resolve;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "flowmap",
    about = "Network-topology discovery and archetype classification",
    long_about = "flowmap - batch classifier that maps observed network-flow tables\n\
                  to architectural archetypes (Microservices, 3-Tier, Event-Driven, ...),\n\
                  resolves service names for protocol/port pairs, and writes enriched\n\
                  CSV/Excel output, a JSON report, and a topology page.",
    version,
    propagate_version = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a flow table: load, score, assign archetypes, write outputs
    Analyze(analyze::AnalyzeArgs),

    /// Resolve a service name for a protocol/port pair
    Lookup(lookup::LookupArgs),

    /// Resolve hostnames over the bounded DNS worker pool
    Resolve(resolve::ResolveArgs),

    /// Print the archetype definition table
    Archetypes(archetypes::ArchetypesArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args),
        Commands::Lookup(args) => lookup::run(args),
        Commands::Resolve(args) => resolve::run(args),
        Commands::Archetypes(args) => archetypes::run(args),
    }
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .usage(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .literal(
            clap::builder::styling::AnsiColor::BrightGreen
                .on_default()
                .bold(),
        )
        .placeholder(
            clap::builder::styling::AnsiColor::BrightWhite
                .on_default()
                .dimmed(),
        )
}
