//! Terminal callbacks for the reconciliation driver

use anyhow::Result;
use colored::{ColoredString, Colorize};
use declarative::{ApplyResult, ConfirmCallback, HandlerContext, Level, ProgressCallback};

/// Status symbol for a result
pub fn icon(result: &ApplyResult) -> ColoredString {
    match result {
        ApplyResult::NoChange => "✓".green(),
        ApplyResult::Created | ApplyResult::Modified => "✓".green().bold(),
        ApplyResult::Drifted { .. } => "~".yellow(),
        ApplyResult::Skipped { .. } => "○".dimmed(),
        ApplyResult::Failed { .. } => "✗".red(),
    }
}

/// Short label for a result
pub fn label(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "in sync".to_string(),
        ApplyResult::Created => "created".to_string(),
        ApplyResult::Modified => "updated".to_string(),
        ApplyResult::Drifted { changes } => format!("{} change(s)", changes.len()),
        ApplyResult::Skipped { reason } => reason.clone(),
        ApplyResult::Failed { error } => error.clone(),
    }
}

/// Prints one line per resource, plus changes and warnings
pub struct Printer {
    verbose: bool,
}

impl Printer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressCallback for Printer {
    fn on_resource_start(&mut self, id: &str, description: &str) {
        if self.verbose {
            println!("  {} {} {}", "→".blue(), id, description.dimmed());
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult, ctx: &HandlerContext) {
        let detail = match result {
            ApplyResult::Failed { .. } => label(result).red(),
            _ => label(result).dimmed(),
        };
        println!("  {} {} {}", icon(result), id, detail);

        if let ApplyResult::Drifted { changes } = result {
            for (name, value) in changes {
                for (i, line) in value.to_string().lines().enumerate() {
                    if i == 0 {
                        println!("      {} {}", format!("{}:", name).yellow(), line);
                    } else {
                        println!("      {}", line);
                    }
                }
            }
        }

        for message in ctx.messages(Level::Warn) {
            println!("      {} {}", "⚠".yellow(), message);
        }
        if self.verbose {
            for message in ctx.messages(Level::Info) {
                println!("      {}", message.dimmed());
            }
        }
    }
}

/// Asks on the terminal before applying
pub struct Prompt;

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        println!();
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ChangeSet;

    #[test]
    fn test_labels() {
        let mut changes = ChangeSet::new();
        changes.insert("ProcessorCount", 2u32);
        changes.insert("Path", "D:\\VMs");

        assert_eq!(label(&ApplyResult::NoChange), "in sync");
        assert_eq!(label(&ApplyResult::Drifted { changes }), "2 change(s)");
        assert_eq!(
            label(&ApplyResult::Skipped {
                reason: "absent (dry run)".to_string()
            }),
            "absent (dry run)"
        );
    }
}
