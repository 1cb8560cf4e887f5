use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use flowmap_core::dns::ResolverPool;
use flowmap_core::loader::load_flow_table;
use flowmap_core::models::AssignmentMethod;
use flowmap_core::refine::{refine_assignments, RemapPolicy};
use flowmap_core::scorer::classify_all;
use flowmap_core::{export, report};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the flow table (.csv or .xlsx)
    pub input: PathBuf,

    /// Worksheet name for Excel input (default: "Network Flows", else first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Output directory for report.json and enrichment files
    #[arg(short, long, default_value = "flowmap-out")]
    pub out: PathBuf,

    /// Write enriched CSV alongside the report
    #[arg(long, default_value_t = false)]
    pub csv: bool,

    /// Write enriched Excel workbook alongside the report
    #[arg(long, default_value_t = false)]
    pub xlsx: bool,

    /// Write the topology HTML page alongside the report
    #[arg(long, default_value_t = false)]
    pub html: bool,

    /// Minimum loaded rows required to proceed
    #[arg(long, default_value_t = 1)]
    pub min_rows: usize,

    /// Enable the probabilistic SOA remap with this seed (off by default)
    #[arg(long)]
    pub remap_seed: Option<u64>,

    /// Resolve endpoint hostnames via the DNS worker pool
    #[arg(long, default_value_t = false)]
    pub resolve_dns: bool,

    /// DNS worker pool size
    #[arg(long, default_value_t = 8)]
    pub dns_workers: usize,

    /// Per-lookup DNS timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub dns_timeout_ms: u64,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let started = Instant::now();
    let steps = 3 + usize::from(args.resolve_dns);
    let mut step = 0usize;
    let mut next_step = |label: &str| {
        step += 1;
        println!(
            "  {}",
            console::style(format!("[{}/{}] {}", step, steps, label))
                .cyan()
                .bold(),
        );
    };

    // 1. Load
    next_step("loading flow table");
    let table = load_flow_table(&args.input, args.sheet.as_deref())
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    println!(
        "        {} rows loaded, {} skipped, sha256:{}",
        console::style(table.records.len()).green().bold(),
        table.skipped_rows,
        &table.sha256[..16],
    );

    if table.records.len() < args.min_rows {
        println!(
            "  {} only {} usable row(s), need {} -- nothing to classify",
            console::style("warning:").yellow().bold(),
            table.records.len(),
            args.min_rows,
        );
        return Ok(());
    }

    // 2. Classify
    next_step("scoring applications");
    let mut outcome = classify_all(&table.records);

    let policy = match args.remap_seed {
        Some(seed) => RemapPolicy::seeded(seed),
        None => RemapPolicy::default(),
    };
    refine_assignments(&mut outcome.assignments, &outcome.profiles, &policy);

    println!(
        "        {} application(s) classified",
        console::style(outcome.assignments.len()).green().bold(),
    );
    for assignment in outcome.assignments.iter().take(15) {
        let method = match assignment.method {
            AssignmentMethod::Score => {
                console::style(format!("{:.0}", assignment.score)).green()
            }
            AssignmentMethod::CategoryVote => console::style("vote".to_string()).yellow(),
            AssignmentMethod::Default => console::style("default".to_string()).dim(),
        };
        println!(
            "          {} -> {} [{}]",
            assignment.application,
            console::style(&assignment.archetype).cyan(),
            method,
        );
    }
    if outcome.assignments.len() > 15 {
        println!("          ... and {} more", outcome.assignments.len() - 15);
    }

    // 3. Optional DNS resolution
    if args.resolve_dns {
        next_step("resolving hostnames");
        let mut hosts: Vec<String> = Vec::new();
        for rec in &table.records {
            for ep in [&rec.source, &rec.destination] {
                if let Some(ref h) = ep.hostname {
                    hosts.push(h.clone());
                } else if !ep.identifier.is_empty() {
                    hosts.push(ep.identifier.clone());
                }
            }
        }
        hosts.sort_unstable();
        hosts.dedup();

        let pool = ResolverPool::new(
            args.dns_workers,
            Duration::from_millis(args.dns_timeout_ms),
        );
        let resolved = pool.resolve_all(&hosts);
        let hits = resolved.values().filter(|v| v.is_some()).count();
        println!(
            "        {} of {} host(s) resolved",
            console::style(hits).green().bold(),
            resolved.len(),
        );
    }

    // 4. Write outputs
    next_step("writing outputs");
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("cannot create output dir {}", args.out.display()))?;

    let elapsed = started.elapsed();
    let analysis_report = report::build_report(
        &table,
        outcome,
        args.remap_seed,
        elapsed.as_millis() as u64,
    );

    // Export problems downgrade to a partial-failure notice; the analysis
    // itself already succeeded.
    let mut write_errors = 0usize;
    let mut emit = |label: &str, result: Result<()>| match result {
        Ok(()) => println!(
            "        {} {}",
            console::style("->").green().bold(),
            args.out.join(label).display(),
        ),
        Err(e) => {
            write_errors += 1;
            println!(
                "        {} {}: {:#}",
                console::style("write failed:").red().bold(),
                label,
                e,
            );
        }
    };

    emit(
        "report.json",
        export::write_json_report(&analysis_report, &args.out.join("report.json")),
    );
    if args.csv {
        emit(
            "enriched.csv",
            export::write_enriched_csv(
                &table,
                &analysis_report.assignments,
                &args.out.join("enriched.csv"),
            ),
        );
    }
    if args.xlsx {
        emit(
            "enriched.xlsx",
            export::write_enriched_xlsx(
                &table,
                &analysis_report.assignments,
                &args.out.join("enriched.xlsx"),
            ),
        );
    }
    if args.html {
        emit(
            "topology.html",
            export::write_topology_html(&analysis_report, &args.out.join("topology.html")),
        );
    }

    println!();
    if write_errors > 0 {
        println!(
            "  {} completed with {} failed write(s)",
            console::style("partial:").yellow().bold(),
            write_errors,
        );
    }
    println!(
        "  {} {} application(s), {} row(s) in {:.1}ms",
        console::style("summary:").white().bold(),
        analysis_report.assignments.len(),
        analysis_report.metadata.loaded_rows,
        elapsed.as_secs_f64() * 1000.0,
    );

    Ok(())
}
