use anyhow::Result;
use clap::Args;

use flowmap_core::services::lookup_service;

#[derive(Args)]
pub struct LookupArgs {
    /// Service spec: "tcp:443", "443", or a bare protocol like "mqtt"
    pub spec: String,
}

pub fn run(args: LookupArgs) -> Result<()> {
    let spec = args.spec.trim();
    let (protocol, port) = match spec.split_once(|c: char| c == ':' || c == '/') {
        Some((proto, port)) => (proto.to_string(), port.trim().parse::<u16>().ok()),
        None => match spec.parse::<u16>() {
            Ok(port) => (String::new(), Some(port)),
            Err(_) => (spec.to_string(), None),
        },
    };

    let service = lookup_service(&protocol, port);
    println!(
        "  {} {} [{:?}]",
        console::style("service:").green().bold(),
        console::style(&service.name).cyan(),
        service.category,
    );
    Ok(())
}
