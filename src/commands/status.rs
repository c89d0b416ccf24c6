//! `hvconverge status`

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ExecuteSummary, Resource as _};

use super::{load, preview, provider, select};
use crate::Context;
use crate::progress::{icon, label};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = load(ctx)?;
    let resources = select(&loaded.resources, target)?;
    let provider = provider(&loaded.document);

    if !ctx.quiet {
        ui::header("Hyper-V Status");
        ui::kv("Document", &loaded.path.display().to_string());
    }

    let mut hosts: Vec<&str> = Vec::new();
    for resource in &resources {
        let name = resource.host().name.as_str();
        if !hosts.contains(&name) {
            hosts.push(name);
        }
    }

    let mut summary = ExecuteSummary::default();
    for host in hosts {
        ui::section(host);
        for resource in resources.iter().filter(|r| r.host().name == host) {
            let (result, _) = preview(&provider, resource);
            summary.add_result(&result);

            let state = match &result {
                ApplyResult::Skipped { .. } => "absent".yellow(),
                ApplyResult::Failed { .. } => label(&result).red(),
                _ => label(&result).dimmed(),
            };
            println!(
                "  {} {:<16} {} {}",
                icon(&result),
                resource.resource_type(),
                resource.id(),
                state
            );
        }
    }

    print_totals(&summary);
    Ok(())
}

fn print_totals(summary: &ExecuteSummary) {
    println!();
    let mut parts = vec![format!("{} in sync", summary.no_change)];
    if summary.drifted > 0 {
        parts.push(format!("{} drifted", summary.drifted).yellow().to_string());
    }
    if summary.skipped > 0 {
        parts.push(format!("{} absent", summary.skipped).yellow().to_string());
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed).red().to_string());
    }
    println!("  {}", parts.join(", "));

    if summary.drifted + summary.skipped > 0 {
        ui::dim("Run 'hvconverge diff' for details or 'hvconverge apply' to converge");
    }
}
