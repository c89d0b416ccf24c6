//! `hvconverge apply`

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{AutoConfirm, ConfirmCallback, ExecuteSummary, ReconcileOptions, execute};
use hyperv::{Provider, Resource};

use super::{load, provider, select};
use crate::Context;
use crate::progress::{Printer, Prompt};
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let loaded = load(ctx)?;
    let resources = select(&loaded.resources, target)?;
    let provider = provider(&loaded.document);

    if !ctx.quiet {
        ui::header(if dry_run {
            "Apply (dry run)"
        } else {
            "Apply"
        });
        ui::kv("Document", &loaded.path.display().to_string());
        ui::kv("Resources", &resources.len().to_string());
        println!();
    }

    let opts = ReconcileOptions { dry_run };
    let summary = if yes {
        converge(&resources, &provider, &opts, ctx, &mut AutoConfirm)?
    } else {
        converge(&resources, &provider, &opts, ctx, &mut Prompt)?
    };

    if dry_run {
        let pending = summary.drifted + summary.skipped;
        println!();
        if pending == 0 {
            ui::success("Everything is in sync");
        } else {
            ui::info(&format!("{} resource(s) would change", pending));
        }
    } else if summary.total_changes() == 0 && summary.is_success() && summary.skipped == 0 {
        ui::success("Everything is in sync");
    } else {
        print_summary(&summary);
    }

    if !summary.is_success() {
        bail!("{} resource(s) failed", summary.failed);
    }
    Ok(())
}

fn converge<C: ConfirmCallback>(
    resources: &[Resource],
    provider: &Provider,
    opts: &ReconcileOptions,
    ctx: &Context,
    confirm: &mut C,
) -> Result<ExecuteSummary> {
    let mut printer = Printer::new(ctx.verbose > 0);
    execute(resources, provider, opts, &mut printer, confirm)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Hosts converged", "✓".green().bold());
    } else {
        println!("  {} Converged with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources updated", summary.modified);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.no_change > 0 {
        println!("    • {} resources in sync", summary.no_change);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
