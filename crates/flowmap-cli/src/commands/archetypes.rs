use anyhow::Result;
use clap::Args;

use flowmap_core::archetypes::{ARCHETYPES, DEFAULT_ARCHETYPE, MIN_SCORE_THRESHOLD};

#[derive(Args)]
pub struct ArchetypesArgs {
    /// Include indicator strings in the listing
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

pub fn run(args: ArchetypesArgs) -> Result<()> {
    let mut defs: Vec<_> = ARCHETYPES.iter().collect();
    defs.sort_by_key(|d| d.name);

    for def in defs {
        let marker = if def.name == DEFAULT_ARCHETYPE {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {}{} [weight {}]",
            console::style(def.name).cyan().bold(),
            console::style(marker).dim(),
            def.priority_weight,
        );
        if !def.protocols.is_empty() {
            println!("        protocols: {}", def.protocols.join(", "));
        }
        if !def.ports.is_empty() {
            let ports: Vec<String> = def.ports.iter().map(|p| p.to_string()).collect();
            println!("        ports:     {}", ports.join(", "));
        }
        if args.verbose {
            for indicator in def.indicators {
                println!("        - {}", indicator);
            }
        }
    }

    println!(
        "\n  {} minimum selection score: {}",
        console::style("note:").white().bold(),
        MIN_SCORE_THRESHOLD,
    );
    Ok(())
}
