//! `hvconverge diff`

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyResult, ChangeValue, Resource as _};
use serde::Serialize;

use super::{load, preview, provider, select};
use crate::Context;
use crate::ui;

/// What apply would do to one resource
#[derive(Debug, Serialize)]
pub struct Pending {
    pub id: String,
    pub resource_type: &'static str,
    pub action: Action,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One named difference
#[derive(Debug, Serialize)]
pub struct Change {
    pub name: String,
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Error,
}

impl Pending {
    /// None when the resource is in sync
    pub fn from_result(
        id: String,
        resource_type: &'static str,
        result: ApplyResult,
    ) -> Option<Self> {
        let (action, changes, error) = match result {
            ApplyResult::NoChange | ApplyResult::Created | ApplyResult::Modified => return None,
            ApplyResult::Skipped { .. } => (Action::Create, Vec::new(), None),
            ApplyResult::Drifted { changes } => (
                Action::Update,
                changes
                    .iter()
                    .map(|(name, value)| Change {
                        name: name.to_string(),
                        value: value.clone(),
                    })
                    .collect(),
                None,
            ),
            ApplyResult::Failed { error } => (Action::Error, Vec::new(), Some(error)),
        };
        Some(Self {
            id,
            resource_type,
            action,
            changes,
            error,
        })
    }
}

pub fn run(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let loaded = load(ctx)?;
    let resources = select(&loaded.resources, target)?;
    let provider = provider(&loaded.document);

    let pending: Vec<Pending> = resources
        .iter()
        .filter_map(|resource| {
            let (result, _) = preview(&provider, resource);
            Pending::from_result(resource.id(), resource.resource_type(), result)
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        ui::success("Everything is in sync");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Pending Changes");
    }
    for item in &pending {
        print_pending(item);
    }
    Ok(())
}

fn print_pending(item: &Pending) {
    match item.action {
        Action::Create => println!(
            "  {} {} {}",
            "+".green().bold(),
            item.resource_type,
            item.id.bold()
        ),
        Action::Update => {
            println!(
                "  {} {} {}",
                "~".yellow().bold(),
                item.resource_type,
                item.id.bold()
            );
            for Change { name, value } in &item.changes {
                let mut lines = value.to_string();
                if lines.contains('\n') {
                    lines = lines.replace('\n', "\n        ");
                }
                println!("      {} {}", format!("{}:", name).yellow(), lines);
            }
        }
        Action::Error => println!(
            "  {} {} {} {}",
            "✗".red(),
            item.resource_type,
            item.id.bold(),
            item.error.as_deref().unwrap_or_default().red()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ChangeSet;

    #[test]
    fn test_in_sync_is_not_pending() {
        let pending = Pending::from_result("LAN".to_string(), "InternalSwitch", ApplyResult::NoChange);
        assert!(pending.is_none());
    }

    #[test]
    fn test_pending_json_shape() {
        let mut changes = ChangeSet::new();
        changes.insert("ProcessorCount", 4u32);
        changes.insert("MissingSwitches", vec!["LAN".to_string()]);

        let pending = Pending::from_result(
            "web01".to_string(),
            "VirtualMachine",
            ApplyResult::Drifted { changes },
        )
        .unwrap();
        let absent = Pending::from_result(
            "LAN".to_string(),
            "InternalSwitch",
            ApplyResult::Skipped {
                reason: "absent (dry run)".to_string(),
            },
        )
        .unwrap();

        let value = serde_json::to_value([pending, absent]).unwrap();
        assert_eq!(value[0]["action"], "update");
        assert_eq!(value[0]["changes"][0]["name"], "ProcessorCount");
        assert_eq!(value[0]["changes"][0]["value"], 4);
        assert_eq!(value[0]["changes"][1]["value"][0], "LAN");
        assert_eq!(value[1]["action"], "create");
        assert!(value[1].get("changes").is_none());
    }
}
