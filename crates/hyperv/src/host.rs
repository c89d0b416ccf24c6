//! Hyper-V host reconciler.
//!
//! A host is "deployed" when the Hyper-V role is enabled. Only Windows 10
//! class hosts are queried for the optional feature; any other Windows
//! version goes straight to the install policy.
//!
//! The install policy is decided during `read`, so a dry run reports a
//! host that may not be installed as failed rather than pending.

use std::sync::Arc;

use anyhow::Result;
use declarative::{Handler, HandlerContext};
use pwshkit::{Command, Executor};

use crate::error::Error;
use crate::model::{HostResource, OsFingerprint, Resource, kind};
use crate::observed::{FeatureInfo, OsInfo};
use crate::session::Session;

/// Feature name of the Hyper-V role
const HYPERV_FEATURE: &str = "Microsoft-Hyper-V";

/// Reconciles [`HostResource`]s
pub struct HostHandler {
    exec: Arc<dyn Executor>,
}

impl HostHandler {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self { exec }
    }

    fn expect<'r>(&self, resource: &'r Resource) -> crate::Result<&'r HostResource> {
        match resource {
            Resource::Host(host) => Ok(host.as_ref()),
            other => Err(Error::TypeMismatch {
                expected: kind::HOST,
                found: declarative::Resource::resource_type(other),
            }),
        }
    }

    /// Declared OS, or whatever the host reports
    fn fingerprint(
        &self,
        session: &Session<'_>,
        host: &HostResource,
        ctx: &mut HandlerContext,
    ) -> crate::Result<OsFingerprint> {
        if let Some(os) = &host.os {
            return Ok(os.clone());
        }

        let query = Command::new("Get-CimInstance")
            .positional("Win32_OperatingSystem")
            .to_json();
        let output = session.query(&query)?;
        let caption = serde_json::from_str::<OsInfo>(output.text())
            .ok()
            .and_then(|info| info.caption)
            .unwrap_or_default();
        ctx.debug(format!("reported OS: '{}'", caption));
        Ok(OsFingerprint::from_caption(&caption))
    }
}

fn feature_query() -> Command {
    Command::new("Get-WindowsOptionalFeature")
        .flag("Online")
        .raw("FeatureName", HYPERV_FEATURE)
        .to_json()
}

impl Handler<Resource> for HostHandler {
    fn resource_type(&self) -> &'static str {
        kind::HOST
    }

    fn read(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let host = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &host.target);

        let os = self.fingerprint(&session, host, ctx)?;
        ctx.extras
            .insert("os".to_string(), serde_json::Value::from(os.version.clone()));

        if !os.is_windows() {
            return Err(Error::PreconditionFailed(format!(
                "host {} doesn't seem to be a Windows machine (reported '{}')",
                host.name, os.version
            ))
            .into());
        }

        if os.version.contains("10") {
            let feature: FeatureInfo = session.json("optional feature", &feature_query())?;
            if feature.is_installed() {
                ctx.debug("Hyper-V state: installed.");
                ctx.deployed = true;
                return Ok(());
            }
            ctx.debug(format!("Hyper-V state: {:?}", feature.state));
        } else {
            ctx.debug(format!(
                "'{}' is not Windows 10 class, feature check skipped",
                os.version
            ));
        }

        if !host.install {
            return Err(Error::NotInstalledAndInstallNotPermitted.into());
        }
        Ok(())
    }

    fn create(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let host = self.expect(resource)?;
        ctx.warn(format!(
            "Hyper-V is not installed on {}; enable the {} feature and run again",
            host.name, HYPERV_FEATURE
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ApplyResult, ReconcileOptions, reconcile};
    use pwshkit::{MockExecutor, Target};

    fn host(os: Option<&str>, install: bool) -> Resource {
        let mut host = HostResource::new("hv01", Target::new("hv01.lab")).with_install(install);
        if let Some(os) = os {
            host = host.with_os(os);
        }
        Resource::Host(Arc::new(host))
    }

    fn run(mock: &Arc<MockExecutor>, resource: &Resource) -> (ApplyResult, HandlerContext) {
        let handler = HostHandler::new(mock.clone());
        let mut ctx = HandlerContext::new("HyperVHost.hv01");
        let result = reconcile(&handler, resource, &mut ctx, &ReconcileOptions::default());
        (result, ctx)
    }

    #[test]
    fn test_installed_feature_is_deployed() {
        let mock = Arc::new(
            MockExecutor::new().on_stdout("Get-WindowsOptionalFeature", r#"{"State": 2}"#),
        );
        let (result, ctx) = run(&mock, &host(Some("Windows 10 Pro"), false));

        assert_eq!(result, ApplyResult::NoChange);
        assert!(ctx.deployed);
        assert!(!ctx.failed);
        assert_eq!(
            mock.commands(),
            ["Get-WindowsOptionalFeature -Online -FeatureName Microsoft-Hyper-V | ConvertTo-Json"]
        );
    }

    #[test]
    fn test_missing_feature_without_install_fails() {
        let mock = Arc::new(
            MockExecutor::new().on_stdout("Get-WindowsOptionalFeature", r#"{"State": 1}"#),
        );
        let (result, ctx) = run(&mock, &host(Some("Windows 10 Pro"), false));

        assert!(matches!(result, ApplyResult::Failed { .. }));
        assert!(ctx.failed);
        assert!(!ctx.deployed);
        let fault = ctx.fault.as_ref().unwrap().downcast_ref::<Error>();
        assert!(matches!(fault, Some(Error::NotInstalledAndInstallNotPermitted)));
    }

    #[test]
    fn test_missing_feature_without_install_fails_in_dry_run() {
        let mock = Arc::new(
            MockExecutor::new().on_stdout("Get-WindowsOptionalFeature", r#"{"State": 1}"#),
        );
        let handler = HostHandler::new(mock.clone());
        let mut ctx = HandlerContext::new("HyperVHost.hv01");

        let result = reconcile(
            &handler,
            &host(Some("Windows 10 Pro"), false),
            &mut ctx,
            &ReconcileOptions { dry_run: true },
        );

        assert!(matches!(result, ApplyResult::Failed { .. }));
        assert!(ctx.failed);
        assert!(!ctx.deployed);
        let fault = ctx.fault.as_ref().unwrap().downcast_ref::<Error>();
        assert!(matches!(fault, Some(Error::NotInstalledAndInstallNotPermitted)));
    }

    #[test]
    fn test_missing_feature_with_install_is_pending_in_dry_run() {
        let mock = Arc::new(
            MockExecutor::new().on_stdout("Get-WindowsOptionalFeature", r#"{"State": 1}"#),
        );
        let handler = HostHandler::new(mock.clone());
        let mut ctx = HandlerContext::new("HyperVHost.hv01");

        let result = reconcile(
            &handler,
            &host(Some("Windows 10 Pro"), true),
            &mut ctx,
            &ReconcileOptions { dry_run: true },
        );

        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!ctx.failed);
    }

    #[test]
    fn test_missing_feature_with_install_is_skipped() {
        let mock = Arc::new(
            MockExecutor::new().on_stdout("Get-WindowsOptionalFeature", r#"{"State": 1}"#),
        );
        let (result, ctx) = run(&mock, &host(Some("Windows 10 Enterprise"), true));

        assert!(matches!(result, ApplyResult::Skipped { .. }));
        assert!(!ctx.failed);
        assert!(!ctx.deployed);
        assert_eq!(mock.commands().len(), 1);
    }

    #[test]
    fn test_non_windows_10_skips_feature_check() {
        let mock = Arc::new(MockExecutor::new());
        let (result, ctx) = run(&mock, &host(Some("Windows Server 2022 Datacenter"), false));

        assert!(mock.commands().is_empty());
        assert!(ctx.failed);
        assert!(matches!(result, ApplyResult::Failed { ref error } if error.contains("install parameter")));
    }

    #[test]
    fn test_non_windows_host_fails_precondition() {
        let mock = Arc::new(MockExecutor::new());
        let (result, ctx) = run(&mock, &host(Some("Ubuntu 22.04.3 LTS"), true));

        assert!(matches!(result, ApplyResult::Failed { .. }));
        let fault = ctx.fault.as_ref().unwrap().downcast_ref::<Error>();
        assert!(matches!(fault, Some(Error::PreconditionFailed(_))));
        assert!(mock.commands().is_empty());
    }

    #[test]
    fn test_os_is_detected_when_not_declared() {
        let mock = Arc::new(
            MockExecutor::new()
                .on_stdout(
                    "Win32_OperatingSystem",
                    r#"{"Caption": "Microsoft Windows 10 Pro", "Version": "10.0.19045"}"#,
                )
                .on_stdout("Get-WindowsOptionalFeature", r#"{"State": 2}"#),
        );
        let (result, ctx) = run(&mock, &host(None, false));

        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(ctx.extras["os"], "Microsoft Windows 10 Pro");
        assert_eq!(
            mock.commands()[0],
            r#"Get-CimInstance "Win32_OperatingSystem" | ConvertTo-Json"#
        );
    }

    #[test]
    fn test_unparseable_os_query_is_not_windows() {
        let mock = Arc::new(MockExecutor::new().on_stdout("Win32_OperatingSystem", "Linux"));
        let (_, ctx) = run(&mock, &host(None, false));

        let fault = ctx.fault.as_ref().unwrap().downcast_ref::<Error>();
        assert!(matches!(fault, Some(Error::PreconditionFailed(_))));
    }

    #[test]
    fn test_wrong_kind_is_type_mismatch() {
        let mock = Arc::new(MockExecutor::new());
        let handler = HostHandler::new(mock.clone());
        let disk = Resource::Disk(Arc::new(crate::model::DiskResource::new(
            "a.vhdx",
            Arc::new(HostResource::new("hv01", Target::local())),
            "1GB",
            crate::model::DiskType::Fixed,
        )));
        let mut ctx = HandlerContext::new("t");

        let err = handler.read(&disk, &mut ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::TypeMismatch { expected: "HyperVHost", found: "VirtualDisk" })
        ));
        assert!(mock.calls().is_empty());
    }
}
