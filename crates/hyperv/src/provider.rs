//! Dispatch by resource kind.

use std::sync::Arc;

use anyhow::Result;
use declarative::{Handler, HandlerContext};
use pwshkit::Executor;

use crate::disk::DiskHandler;
use crate::host::HostHandler;
use crate::machine::{MachineHandler, SecureBootCheck};
use crate::model::{Resource, SwitchType};
use crate::switch::SwitchHandler;

/// Every Hyper-V handler behind one [`Handler`]
pub struct Provider {
    host: HostHandler,
    internal: SwitchHandler,
    private: SwitchHandler,
    external: SwitchHandler,
    disk: DiskHandler,
    machine: MachineHandler,
}

impl Provider {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self {
            host: HostHandler::new(exec.clone()),
            internal: SwitchHandler::internal(exec.clone()),
            private: SwitchHandler::private(exec.clone()),
            external: SwitchHandler::external(exec.clone()),
            disk: DiskHandler::new(exec.clone()),
            machine: MachineHandler::new(exec),
        }
    }

    pub fn with_secure_boot_check(mut self, check: SecureBootCheck) -> Self {
        self.machine = self.machine.with_secure_boot_check(check);
        self
    }

    /// The handler registered for this resource's kind
    pub fn handler_for(&self, resource: &Resource) -> &dyn Handler<Resource> {
        match resource {
            Resource::Host(_) => &self.host,
            Resource::Switch(switch) => match switch.switch_type() {
                SwitchType::Internal => &self.internal,
                SwitchType::Private => &self.private,
                SwitchType::External => &self.external,
            },
            Resource::Disk(_) => &self.disk,
            Resource::Machine(_) => &self.machine,
        }
    }
}

impl Handler<Resource> for Provider {
    fn resource_type(&self) -> &'static str {
        "HyperV"
    }

    fn read(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        self.handler_for(resource).read(resource, ctx)
    }

    fn create(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        self.handler_for(resource).create(resource, ctx)
    }

    fn update(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        self.handler_for(resource).update(resource, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiskResource, DiskType, HostResource, SwitchResource};
    use declarative::{AutoConfirm, ExecuteSummary, NoProgress, ReconcileOptions, execute};
    use pwshkit::{MockExecutor, Output, Target};

    fn host() -> Arc<HostResource> {
        Arc::new(HostResource::new("hv01", Target::new("hv01.lab")).with_os("Windows 10 Pro"))
    }

    #[test]
    fn test_dispatch_by_kind() {
        let provider = Provider::new(Arc::new(MockExecutor::new()));
        let cases = [
            (Resource::Host(host()), "HyperVHost"),
            (
                Resource::Switch(Arc::new(SwitchResource::private("LAN", host()))),
                "PrivateSwitch",
            ),
            (
                Resource::Switch(Arc::new(SwitchResource::external("LAN", host(), "Ethernet"))),
                "ExternalSwitch",
            ),
            (
                Resource::Disk(Arc::new(DiskResource::new("a.vhdx", host(), "1GB", DiskType::Fixed))),
                "VirtualDisk",
            ),
        ];

        for (resource, expected) in cases {
            assert_eq!(provider.handler_for(&resource).resource_type(), expected);
        }
    }

    #[test]
    fn test_execute_in_document_order() {
        let mock = Arc::new(
            MockExecutor::new()
                .on_stdout("Get-WindowsOptionalFeature", r#"{"State": 2}"#)
                .on(
                    "Get-VMSwitch",
                    Output::err("Hyper-V was unable to find a virtual switch with name \"LAN\"."),
                )
                .on(
                    "Get-VHD",
                    Output::err("'a.vhdx' is not an existing virtual hard disk file."),
                ),
        );
        let provider = Provider::new(mock.clone());
        let resources = vec![
            Resource::Host(host()),
            Resource::Switch(Arc::new(SwitchResource::internal("LAN", host()))),
            Resource::Disk(Arc::new(DiskResource::new("a.vhdx", host(), "1GB", DiskType::Fixed))),
        ];

        let summary = execute(
            &resources,
            &provider,
            &ReconcileOptions::default(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(
            summary,
            ExecuteSummary {
                created: 2,
                no_change: 1,
                ..Default::default()
            }
        );
        let creates: Vec<String> = mock
            .commands()
            .into_iter()
            .filter(|c| c.starts_with("New-"))
            .collect();
        assert_eq!(
            creates,
            [
                r#"New-VMSwitch -Name "LAN" -SwitchType Internal"#,
                r#"New-VHD -Path "a.vhdx" -SizeBytes 1073741824 -Fixed"#,
            ]
        );
    }

    #[test]
    fn test_dry_run_sends_no_mutation() {
        let mock = Arc::new(MockExecutor::new().on(
            "Get-VMSwitch",
            Output::err("Hyper-V was unable to find a virtual switch with name \"LAN\"."),
        ));
        let provider = Provider::new(mock.clone());
        let resources = vec![Resource::Switch(Arc::new(SwitchResource::internal(
            "LAN",
            host(),
        )))];

        let summary = execute(
            &resources,
            &provider,
            &ReconcileOptions { dry_run: true },
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(mock.commands().iter().all(|c| c.starts_with("Get-")));
    }
}
