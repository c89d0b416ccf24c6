//! Virtual hard disk reconciler.
//!
//! Disks are only ever created. Size and type drift is noted in the log
//! but never recorded as a change, and creation does not check for an
//! existing file at the path.

use std::sync::Arc;

use anyhow::Result;
use declarative::{Handler, HandlerContext};
use pwshkit::{Command, Executor};

use crate::diagnostics::disk_absent;
use crate::error::Error;
use crate::model::{DiskResource, DiskType, Resource, kind};
use crate::observed::{self, VhdInfo};
use crate::session::Session;
use crate::units::format_size;

/// `VhdType` reported for fixed disks
const VHD_TYPE_FIXED: i64 = 2;
/// `VhdType` reported for dynamically expanding disks
const VHD_TYPE_DYNAMIC: i64 = 3;

/// Reconciles [`DiskResource`]s
pub struct DiskHandler {
    exec: Arc<dyn Executor>,
}

impl DiskHandler {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self { exec }
    }

    fn expect<'r>(&self, resource: &'r Resource) -> crate::Result<&'r DiskResource> {
        match resource {
            Resource::Disk(disk) => Ok(disk.as_ref()),
            other => Err(Error::TypeMismatch {
                expected: kind::DISK,
                found: declarative::Resource::resource_type(other),
            }),
        }
    }
}

fn create_command(disk: &DiskResource) -> crate::Result<Command> {
    Ok(Command::new("New-VHD")
        .arg("Path", &disk.path)
        .raw("SizeBytes", disk.size_bytes()?)
        .flag(disk.disk_type.flag()))
}

/// Log size and type differences
fn note_drift(disk: &DiskResource, info: &VhdInfo, ctx: &mut HandlerContext) {
    match (info.size, disk.size_bytes()) {
        (Some(size), Ok(want)) if size != want => ctx.debug(format!(
            "disk {} is {}, declared {} (not corrected)",
            disk.path,
            format_size(size),
            disk.size
        )),
        _ => {}
    }

    let want = match disk.disk_type {
        DiskType::Fixed => VHD_TYPE_FIXED,
        DiskType::Dynamic => VHD_TYPE_DYNAMIC,
    };
    if let Some(vhd_type) = info.vhd_type.filter(|t| *t != want) {
        ctx.debug(format!(
            "disk {} has VhdType {}, declared {} (not corrected)",
            disk.path,
            vhd_type,
            disk.disk_type.flag()
        ));
    }
}

impl Handler<Resource> for DiskHandler {
    fn resource_type(&self) -> &'static str {
        kind::DISK
    }

    fn read(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let disk = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &disk.host.target);

        let output = session.query(&Command::new("Get-VHD").arg("Path", &disk.path).to_json())?;
        if disk_absent(&output) {
            ctx.debug(format!("disk {} not found", disk.path));
            return Ok(());
        }

        let output = session.ensure_success(output)?;
        let info: VhdInfo = observed::parse("disk", output.text())?;
        note_drift(disk, &info, ctx);
        ctx.extras
            .insert("info".to_string(), serde_json::to_value(&info)?);
        ctx.deployed = true;
        Ok(())
    }

    fn create(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let disk = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &disk.host.target);

        session.check(&create_command(disk)?)?;
        ctx.info(format!("created {} disk {}", disk.size, disk.path));
        ctx.deployed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HostResource;
    use declarative::{ApplyResult, ReconcileOptions, reconcile};
    use pwshkit::{MockExecutor, Output, Target};

    const NOT_FOUND: &str =
        r"Get-VHD : 'C:\VMs\web01.vhdx' is not an existing virtual hard disk file.";

    fn disk(size: &str, disk_type: DiskType) -> Resource {
        let host = Arc::new(HostResource::new("hv01", Target::new("hv01.lab")));
        Resource::Disk(Arc::new(DiskResource::new(
            r"C:\VMs\web01.vhdx",
            host,
            size,
            disk_type,
        )))
    }

    fn run(mock: &Arc<MockExecutor>, resource: &Resource) -> (ApplyResult, HandlerContext) {
        let handler = DiskHandler::new(mock.clone());
        let mut ctx = HandlerContext::new("VirtualDisk.web01");
        let result = reconcile(&handler, resource, &mut ctx, &ReconcileOptions::default());
        (result, ctx)
    }

    #[test]
    fn test_absent_disk_is_created_with_byte_size() {
        let mock = Arc::new(MockExecutor::new().on("Get-VHD", Output::err(NOT_FOUND)));
        let (result, ctx) = run(&mock, &disk("40GB", DiskType::Dynamic));

        assert_eq!(result, ApplyResult::Created);
        assert!(ctx.deployed);
        assert_eq!(
            mock.commands(),
            [
                r#"Get-VHD -Path "C:\VMs\web01.vhdx" | ConvertTo-Json"#,
                r#"New-VHD -Path "C:\VMs\web01.vhdx" -SizeBytes 42949672960 -Dynamic"#,
            ]
        );
    }

    #[test]
    fn test_fixed_flag() {
        let mock = Arc::new(MockExecutor::new().on("Get-VHD", Output::err(NOT_FOUND)));
        run(&mock, &disk("1024MB", DiskType::Fixed));

        assert!(mock.commands()[1].ends_with("-SizeBytes 1073741824 -Fixed"));
    }

    #[test]
    fn test_present_disk_never_drifts() {
        let mock = Arc::new(MockExecutor::new().on_stdout(
            "Get-VHD",
            r#"{"Path": "C:\\VMs\\web01.vhdx", "VhdType": 2, "Size": 10737418240}"#,
        ));
        let (result, ctx) = run(&mock, &disk("40GB", DiskType::Dynamic));

        assert_eq!(result, ApplyResult::NoChange);
        assert!(ctx.deployed);
        assert!(ctx.changes.is_empty());
        assert_eq!(ctx.extras["info"]["Size"], 10_737_418_240u64);
        assert!(ctx.messages(declarative::Level::Debug).any(|m| m.contains("10GB")));
        assert_eq!(mock.commands().len(), 1);
    }

    #[test]
    fn test_invalid_size_fails_before_create() {
        let mock = Arc::new(MockExecutor::new().on("Get-VHD", Output::err(NOT_FOUND)));
        let (result, ctx) = run(&mock, &disk("lots", DiskType::Fixed));

        assert!(matches!(result, ApplyResult::Failed { .. }));
        let fault = ctx.fault.as_ref().unwrap().downcast_ref::<Error>();
        assert!(matches!(fault, Some(Error::InvalidSize(_))));
        assert_eq!(mock.commands().len(), 1);
    }

    #[test]
    fn test_other_errors_are_not_absence() {
        let mock = Arc::new(MockExecutor::new().on("Get-VHD", Output::err("Access is denied.")));
        let (result, ctx) = run(&mock, &disk("40GB", DiskType::Fixed));

        assert!(matches!(result, ApplyResult::Failed { .. }));
        assert!(!ctx.deployed);
        assert_eq!(mock.commands().len(), 1);
    }
}
