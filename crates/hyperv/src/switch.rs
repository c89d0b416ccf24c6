//! Virtual switch reconciler.
//!
//! Reading a switch is the same for every switch type; only an external
//! switch has settings beyond its name, so only it diffs and updates.
//! One [`SwitchHandler`] serves one [`SwitchType`] and refuses the others.

use std::sync::Arc;

use anyhow::Result;
use declarative::{ChangeValue, Handler, HandlerContext};
use pwshkit::{Command, Executor};

use crate::diagnostics::switch_absent;
use crate::error::Error;
use crate::model::{ExternalSettings, Resource, SwitchKind, SwitchResource, SwitchType};
use crate::observed::{self, SwitchInfo};
use crate::session::Session;

/// Change keys
pub const IOV_ENABLED: &str = "IovEnabled";
pub const ALLOW_MANAGEMENT_OS: &str = "AllowManagementOS";
pub const NET_ADAPTER_NAME: &str = "NetAdapterName";

/// Reconciles switches of one type
pub struct SwitchHandler {
    exec: Arc<dyn Executor>,
    switch_type: SwitchType,
}

impl SwitchHandler {
    pub fn new(exec: Arc<dyn Executor>, switch_type: SwitchType) -> Self {
        Self { exec, switch_type }
    }

    pub fn internal(exec: Arc<dyn Executor>) -> Self {
        Self::new(exec, SwitchType::Internal)
    }

    pub fn private(exec: Arc<dyn Executor>) -> Self {
        Self::new(exec, SwitchType::Private)
    }

    pub fn external(exec: Arc<dyn Executor>) -> Self {
        Self::new(exec, SwitchType::External)
    }

    fn expect<'r>(&self, resource: &'r Resource) -> crate::Result<&'r SwitchResource> {
        match resource {
            Resource::Switch(switch) if switch.switch_type() == self.switch_type => {
                Ok(switch.as_ref())
            }
            other => Err(Error::TypeMismatch {
                expected: self.switch_type.resource_type(),
                found: declarative::Resource::resource_type(other),
            }),
        }
    }
}

/// Look a switch up by name
///
/// Sets `deployed` and stores the parsed record under `info` when found.
/// An absent switch leaves the context untouched.
pub(crate) fn read_switch(
    session: &Session<'_>,
    name: &str,
    ctx: &mut HandlerContext,
) -> crate::Result<Option<SwitchInfo>> {
    let output = session.query(&Command::new("Get-VMSwitch").arg("Name", name).to_json())?;
    if switch_absent(&output) {
        ctx.debug(format!("switch {} not found", name));
        return Ok(None);
    }

    let output = session.ensure_success(output)?;
    let info: SwitchInfo = observed::parse("switch", output.text())?;
    if let Ok(value) = serde_json::to_value(&info) {
        ctx.extras.insert("info".to_string(), value);
    }
    ctx.deployed = true;
    Ok(Some(info))
}

/// Name of the physical adapter currently bound to a switch
fn adapter_query(name: &str) -> Command {
    let description = Command::new("Get-VMSwitch")
        .positional(name)
        .property("NetAdapterInterfaceDescription");
    Command::new("Get-NetAdapter")
        .raw("InterfaceDescription", description)
        .property("Name")
}

fn diff_external(
    session: &Session<'_>,
    switch: &SwitchResource,
    desired: &ExternalSettings,
    observed: &SwitchInfo,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    // Unset flags keep whatever the host has and are never compared.
    if let Some(enable_iov) = desired
        .enable_iov
        .filter(|want| observed.iov_enabled != Some(*want))
    {
        ctx.add_change(IOV_ENABLED, enable_iov);
    }

    if let Some(allow) = desired
        .allow_management_os
        .filter(|want| observed.allow_management_os != Some(*want))
    {
        ctx.add_change(ALLOW_MANAGEMENT_OS, allow);
    }

    let bound = session.text(&adapter_query(&switch.name))?;
    if bound != desired.net_adapter_name {
        ctx.debug(format!(
            "switch {} is bound to '{}', want '{}'",
            switch.name, bound, desired.net_adapter_name
        ));
        ctx.add_change(NET_ADAPTER_NAME, desired.net_adapter_name.as_str());
    }

    Ok(())
}

fn create_command(switch: &SwitchResource) -> Command {
    let cmd = Command::new("New-VMSwitch")
        .arg("Name", &switch.name)
        .raw("SwitchType", switch.switch_type());

    match &switch.kind {
        SwitchKind::External(settings) => cmd
            .arg("NetAdapterName", &settings.net_adapter_name)
            .switch_opt("AllowManagementOS", settings.allow_management_os)
            .switch_opt("EnableIov", settings.enable_iov),
        SwitchKind::Internal | SwitchKind::Private => cmd,
    }
}

/// `Set-VMSwitch` with one clause per recognized change
fn update_command(switch: &SwitchResource, ctx: &mut HandlerContext) -> Command {
    let mut cmd = Command::new("Set-VMSwitch").arg("Name", &switch.name);
    let mut unknown = Vec::new();

    for (name, value) in &ctx.changes {
        cmd = match (name, value) {
            (NET_ADAPTER_NAME, ChangeValue::Text(adapter)) => cmd.arg("NetAdapterName", adapter),
            (IOV_ENABLED, ChangeValue::Bool(enabled)) => cmd.switch("EnableIov", *enabled),
            (ALLOW_MANAGEMENT_OS, ChangeValue::Bool(allow)) => {
                cmd.switch("AllowManagementOS", *allow)
            }
            _ => {
                unknown.push(name.to_string());
                cmd
            }
        };
    }

    for name in unknown {
        ctx.debug(format!("ignoring change {}", name));
    }
    cmd
}

impl Handler<Resource> for SwitchHandler {
    fn resource_type(&self) -> &'static str {
        self.switch_type.resource_type()
    }

    fn read(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let switch = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &switch.host.target);

        let Some(info) = read_switch(&session, &switch.name, ctx)? else {
            return Ok(());
        };
        if let SwitchKind::External(desired) = &switch.kind {
            diff_external(&session, switch, desired, &info, ctx)?;
        }
        Ok(())
    }

    fn create(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let switch = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &switch.host.target);

        session.check(&create_command(switch))?;
        ctx.info(format!("created {} switch {}", switch.switch_type(), switch.name));
        ctx.deployed = true;
        Ok(())
    }

    fn update(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let switch = self.expect(resource)?;
        if switch.external_settings().is_none() {
            ctx.deployed = true;
            return Ok(());
        }

        let cmd = update_command(switch, ctx);
        // Only the name clause: nothing this variant knows how to change
        if cmd.clause_count() > 1 {
            let session = Session::new(self.exec.as_ref(), &switch.host.target);
            session.check(&cmd)?;
        }
        ctx.deployed = true;
        Ok(())
    }
}
