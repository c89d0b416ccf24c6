//! Subcommand implementations

pub mod apply;
pub mod diff;
pub mod status;
pub mod validate;

use anyhow::{Context as _, Result, bail};
use declarative::{
    ApplyResult, HandlerContext, ReconcileOptions, Resource as _, filter_by_target, reconcile,
};
use hyperv::{Provider, Resource};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::paths;
use crate::schema::Document;

/// A validated document and its resolved descriptors
pub struct Loaded {
    pub path: PathBuf,
    pub document: Document,
    pub resources: Vec<Resource>,
}

/// Load, validate and resolve the document selected by `--file`
pub fn load(ctx: &Context) -> Result<Loaded> {
    let path = paths::document_path(ctx.file.as_deref())?;
    log::debug!("Loading document from {}", path.display());

    let document = Document::load(&path)?;
    document
        .validate()
        .with_context(|| format!("Invalid document: {}", path.display()))?;
    let resources = document.resources()?;

    Ok(Loaded {
        path,
        document,
        resources,
    })
}

/// Resources matching a target filter, in document order
pub fn select(resources: &[Resource], target: Option<&str>) -> Result<Vec<Resource>> {
    let selected: Vec<Resource> = filter_by_target(resources, target)?
        .into_iter()
        .cloned()
        .collect();

    if let Some(target) = target
        && selected.is_empty()
    {
        bail!("No declared resource matches '{}'", target);
    }
    Ok(selected)
}

/// A provider talking to hosts through the local PowerShell
pub fn provider(document: &Document) -> Provider {
    Provider::new(Arc::new(pwshkit::default_backend()))
        .with_secure_boot_check(document.settings.secure_boot_check)
}

/// Read-only reconciliation of one resource
pub fn preview(provider: &Provider, resource: &Resource) -> (ApplyResult, HandlerContext) {
    let mut hctx = HandlerContext::new(resource.task_id());
    let result = reconcile(
        provider,
        resource,
        &mut hctx,
        &ReconcileOptions { dry_run: true },
    );
    (result, hctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[[hosts]]
name = "hv01"
address = "hv01.lab"

[[switches]]
name = "LAN"
host = "hv01"
type = "internal"

[[machines]]
name = "web01"
host = "hv01"
switches = ["LAN"]
"#;

    fn resources() -> Vec<Resource> {
        Document::parse(DOC).unwrap().resources().unwrap()
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select(&resources(), None).unwrap().len(), 3);
    }

    #[test]
    fn test_select_by_alias() {
        let selected = select(&resources(), Some("switch")).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(matches!(selected[0], Resource::Switch(_)));
    }

    #[test]
    fn test_select_nothing_is_an_error() {
        let err = select(&resources(), Some("VirtualMachine.db01")).unwrap_err();
        assert!(err.to_string().contains("db01"));
    }
}
