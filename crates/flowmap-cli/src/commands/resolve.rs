use std::time::Duration;

use anyhow::Result;
use clap::Args;

use flowmap_core::dns::ResolverPool;

#[derive(Args)]
pub struct ResolveArgs {
    /// Hostnames or IPs to resolve
    #[arg(required = true)]
    pub hosts: Vec<String>,

    /// Worker pool size
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    /// Per-lookup timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let pool = ResolverPool::new(args.workers, Duration::from_millis(args.timeout_ms));
    let results = pool.resolve_all(&args.hosts);

    for (host, resolved) in &results {
        match resolved {
            Some(ip) => println!(
                "  {} -> {}",
                host,
                console::style(ip.to_string()).green(),
            ),
            None => println!(
                "  {} -> {}",
                host,
                console::style("unresolved").yellow().dim(),
            ),
        }
    }

    let hits = results.values().filter(|v| v.is_some()).count();
    println!(
        "\n  {} {} of {} resolved",
        console::style("summary:").white().bold(),
        hits,
        results.len(),
    );
    Ok(())
}
