//! Virtual machine reconciler.
//!
//! Creation is one composite script. Reading a present machine runs a
//! fixed sequence of independent comparisons, each with its own query, and
//! records every difference under its own change key. Update turns the
//! recorded keys back into one corrective script.

use std::sync::Arc;

use anyhow::Result;
use declarative::{ChangeValue, Handler, HandlerContext};
use pwshkit::{Command, Executor, Script};
use serde::{Deserialize, Serialize};

use crate::diagnostics::machine_absent;
use crate::error::Error;
use crate::model::{DiskResource, MachineResource, Resource, kind};
use crate::observed::{self, AdapterInfo, HardDriveInfo, MemoryInfo, ProcessorInfo, VmInfo};
use crate::session::Session;
use crate::units::parse_size;

/// Change keys
pub const PATH: &str = "Path";
pub const PROCESSOR_COUNT: &str = "ProcessorCount";
pub const MISSING_DISKS: &str = "MissingDisks";
pub const MISSING_SWITCHES: &str = "MissingSwitches";
pub const MEMORY_STARTUP_BYTES: &str = "MemoryStartupBytes";
pub const DYNAMIC_MEMORY_ENABLED: &str = "DynamicMemoryEnabled";
pub const MEMORY_MINIMUM_BYTES: &str = "MemoryMinimumBytes";
pub const MEMORY_MAXIMUM_BYTES: &str = "MemoryMaximumBytes";
pub const AUTOMATIC_START_ACTION: &str = "AutomaticStartAction";
pub const AUTOMATIC_STOP_ACTION: &str = "AutomaticStopAction";
pub const AUTOMATIC_START_DELAY: &str = "AutomaticStartDelay";
pub const SECURE_BOOT: &str = "SecureBoot";
pub const SECURE_BOOT_TEMPLATE: &str = "SecureBootTemplate";

/// Microsoft UEFI Certificate Authority
const UEFI_CA_TEMPLATE_ID: &str = "272e7447-90a4-4563-a4b9-8e4ab00cbb7d";
/// Adapter `New-VM` attaches on its own
const DEFAULT_ADAPTER: &str = "Network Adapter";
const GENERATION: u32 = 2;

/// How the secure-boot state is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureBootCheck {
    /// A change is recorded when the observed state equals the declared
    /// one, and the template is compared against the boot-state output.
    #[default]
    Legacy,
    /// A change is recorded when the observed state differs, and the
    /// template is read with its own query.
    Strict,
}

impl SecureBootCheck {
    /// Whether a comparison result means "record a change"
    fn records(self, differs: bool) -> bool {
        match self {
            SecureBootCheck::Legacy => !differs,
            SecureBootCheck::Strict => differs,
        }
    }
}

/// Reconciles [`MachineResource`]s
pub struct MachineHandler {
    exec: Arc<dyn Executor>,
    secure_boot_check: SecureBootCheck,
}

impl MachineHandler {
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        Self {
            exec,
            secure_boot_check: SecureBootCheck::default(),
        }
    }

    pub fn with_secure_boot_check(mut self, check: SecureBootCheck) -> Self {
        self.secure_boot_check = check;
        self
    }

    fn expect<'r>(&self, resource: &'r Resource) -> crate::Result<&'r MachineResource> {
        match resource {
            Resource::Machine(vm) => Ok(vm.as_ref()),
            other => Err(Error::TypeMismatch {
                expected: kind::MACHINE,
                found: declarative::Resource::resource_type(other),
            }),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "On" } else { "Off" }
}

fn size_opt(value: Option<&str>) -> crate::Result<Option<u64>> {
    value.map(parse_size).transpose()
}

/// Paths compare case-insensitively and without a trailing separator
fn same_path(a: &str, b: &str) -> bool {
    let trim = |p: &str| p.trim_end_matches(['\\', '/']).to_ascii_lowercase();
    trim(a) == trim(b)
}

fn vm_property(name: &str, property: &str) -> Command {
    Command::new("Get-VM").arg("Name", name).property(property)
}

fn firmware_property(name: &str, property: &str) -> Command {
    Command::new("Get-VMFirmware")
        .arg("VMName", name)
        .property(property)
}

fn add_disk(name: &str, disk: &DiskResource) -> Command {
    Command::new("Add-VMHardDiskDrive")
        .arg("VMName", name)
        .arg("Path", &disk.path)
}

/// Add an adapter named after the switch and connect it
fn connect_switch(script: &mut Script, name: &str, switch: &str) {
    script.push(
        Command::new("Add-VMNetworkAdapter")
            .arg("VMName", name)
            .arg("Name", switch),
    );
    script.push(
        Command::new("Connect-VMNetworkAdapter")
            .arg("VMName", name)
            .arg("Name", switch)
            .arg("SwitchName", switch),
    );
}

// ============================================================================
// Create
// ============================================================================

fn create_script(vm: &MachineResource, task_id: &str) -> crate::Result<Script> {
    let name = vm.name.as_str();
    let mut script = Script::new();

    if let Some(path) = &vm.path {
        script.push(
            Command::new("New-Item")
                .raw("ItemType", "Directory")
                .flag("Force")
                .arg("Path", path),
        );
    }

    let mut new_vm = Command::new("New-VM")
        .arg("Name", name)
        .raw("Generation", GENERATION)
        .flag("NoVHD")
        .raw("MemoryStartupBytes", parse_size(&vm.startup_ram)?)
        .arg_opt("Path", vm.path.as_deref());
    if vm.install_media.is_some() {
        new_vm = new_vm.raw("BootDevice", "CD");
    }
    script.push(new_vm);

    if let Some(media) = &vm.install_media {
        script.push(
            Command::new("Set-VMDvdDrive")
                .arg("VMName", name)
                .arg("Path", media),
        );
    }

    script.push(
        Command::new("Set-VMProcessor")
            .arg("VMName", name)
            .raw("Count", vm.cpus),
    );
    let mut settings = Command::new("Set-VM")
        .arg("Name", name)
        .arg("Notes", format!("task: {}", task_id));
    if let Some(action) = vm.start_action {
        settings = settings.raw("AutomaticStartAction", action.as_str());
    }
    if let Some(action) = vm.stop_action {
        settings = settings.raw("AutomaticStopAction", action.as_str());
    }
    if let Some(delay) = vm.start_delay {
        settings = settings.raw("AutomaticStartDelay", delay);
    }
    script.push(settings);

    let mut memory = Command::new("Set-VMMemory")
        .arg("VMName", name)
        .bool("DynamicMemoryEnabled", vm.dynamic_ram);
    if vm.dynamic_ram {
        if let Some(min) = size_opt(vm.min_ram.as_deref())? {
            memory = memory.raw("MinimumBytes", min);
        }
        if let Some(max) = size_opt(vm.max_ram.as_deref())? {
            memory = memory.raw("MaximumBytes", max);
        }
    }
    script.push(memory);

    if let Some(enabled) = vm.secure_boot {
        let mut firmware = Command::new("Set-VMFirmware")
            .arg("VMName", name)
            .raw("EnableSecureBoot", on_off(enabled));
        if vm.secure_boot_template.is_some() {
            firmware = firmware.raw("SecureBootTemplateId", UEFI_CA_TEMPLATE_ID);
        }
        script.push(firmware);
    }

    for disk in &vm.disks {
        script.push(add_disk(name, disk));
    }

    script.push(
        Command::new("Remove-VMNetworkAdapter")
            .arg("VMName", name)
            .arg("Name", DEFAULT_ADAPTER),
    );
    for switch in &vm.switches {
        connect_switch(&mut script, name, &switch.name);
    }

    Ok(script)
}

// ============================================================================
// Read
// ============================================================================

fn diff_path(vm: &MachineResource, info: &VmInfo, ctx: &mut HandlerContext) {
    let Some(path) = &vm.path else {
        return;
    };
    let observed = info.path.as_deref().unwrap_or_default();
    if !same_path(path, observed) {
        ctx.add_change(PATH, path.as_str());
        ctx.warn(format!(
            "{} is stored in '{}', declared '{}'; moving a machine is not supported",
            vm.name, observed, path
        ));
    }
}

fn diff_processor(
    session: &Session<'_>,
    vm: &MachineResource,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    let query = Command::new("Get-VMProcessor")
        .arg("VMName", &vm.name)
        .to_json();
    let processor: ProcessorInfo = session.json("processor", &query)?;
    if processor.count != Some(vm.cpus) {
        ctx.add_change(PROCESSOR_COUNT, vm.cpus);
    }
    Ok(())
}

fn diff_disks(
    session: &Session<'_>,
    vm: &MachineResource,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    let query = Command::new("Get-VMHardDiskDrive")
        .arg("VMName", &vm.name)
        .to_json();
    let drives: Vec<HardDriveInfo> = session.list("hard disk drives", &query)?;

    let mut missing = Script::new();
    for disk in &vm.disks {
        let attached = drives
            .iter()
            .filter_map(|drive| drive.path.as_deref())
            .any(|path| same_path(path, &disk.path));
        if !attached {
            missing.push(add_disk(&vm.name, disk));
        }
    }

    if !missing.is_empty() {
        ctx.add_change(MISSING_DISKS, missing.lines().join("\n"));
    }
    Ok(())
}

fn diff_switches(
    session: &Session<'_>,
    vm: &MachineResource,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    let query = Command::new("Get-VMNetworkAdapter")
        .arg("VMName", &vm.name)
        .to_json();
    let adapters: Vec<AdapterInfo> = session.list("network adapters", &query)?;

    let missing: Vec<String> = vm
        .switches
        .iter()
        .filter(|switch| {
            !adapters
                .iter()
                .any(|adapter| adapter.switch_name.as_deref() == Some(switch.name.as_str()))
        })
        .map(|switch| switch.name.clone())
        .collect();

    if !missing.is_empty() {
        ctx.add_change(MISSING_SWITCHES, missing);
    }
    Ok(())
}

fn diff_memory(
    session: &Session<'_>,
    vm: &MachineResource,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    let query = Command::new("Get-VMMemory")
        .arg("VMName", &vm.name)
        .to_json();
    let memory: MemoryInfo = session.json("memory", &query)?;

    let startup = parse_size(&vm.startup_ram)?;
    if memory.startup != Some(startup) {
        ctx.add_change(MEMORY_STARTUP_BYTES, startup);
    }

    if memory.dynamic_memory_enabled != Some(vm.dynamic_ram) {
        ctx.add_change(DYNAMIC_MEMORY_ENABLED, vm.dynamic_ram);
    }

    if vm.dynamic_ram {
        if let Some(min) = size_opt(vm.min_ram.as_deref())?
            .filter(|min| memory.minimum != Some(*min))
        {
            ctx.add_change(MEMORY_MINIMUM_BYTES, min);
        }
        if let Some(max) = size_opt(vm.max_ram.as_deref())?
            .filter(|max| memory.maximum != Some(*max))
        {
            ctx.add_change(MEMORY_MAXIMUM_BYTES, max);
        }
    }
    Ok(())
}

fn diff_automatic_actions(
    session: &Session<'_>,
    vm: &MachineResource,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    if let Some(action) = vm.start_action {
        let observed = session.text(&vm_property(&vm.name, "AutomaticStartAction"))?;
        if observed != action.as_str() {
            ctx.add_change(AUTOMATIC_START_ACTION, action.as_str());
        }
    }

    if let Some(action) = vm.stop_action {
        let observed = session.text(&vm_property(&vm.name, "AutomaticStopAction"))?;
        if observed != action.as_str() {
            ctx.add_change(AUTOMATIC_STOP_ACTION, action.as_str());
        }
    }

    if let Some(delay) = vm.start_delay {
        let observed = session.text(&vm_property(&vm.name, "AutomaticStartDelay"))?;
        if observed.parse::<u32>().ok() != Some(delay) {
            ctx.add_change(AUTOMATIC_START_DELAY, delay);
        }
    }
    Ok(())
}

fn diff_secure_boot(
    session: &Session<'_>,
    vm: &MachineResource,
    check: SecureBootCheck,
    ctx: &mut HandlerContext,
) -> crate::Result<()> {
    if vm.secure_boot.is_none() && vm.secure_boot_template.is_none() {
        return Ok(());
    }

    let state = session.text(&firmware_property(&vm.name, "SecureBoot"))?;

    if let Some(enabled) = vm.secure_boot {
        let differs = !state.eq_ignore_ascii_case(on_off(enabled));
        if check.records(differs) {
            ctx.add_change(SECURE_BOOT, enabled);
        }
    }

    if let Some(template) = &vm.secure_boot_template {
        let observed = match check {
            SecureBootCheck::Legacy => state,
            SecureBootCheck::Strict => {
                session.text(&firmware_property(&vm.name, "SecureBootTemplate"))?
            }
        };
        if check.records(observed != *template) {
            ctx.add_change(SECURE_BOOT_TEMPLATE, template.as_str());
        }
    }
    Ok(())
}

// ============================================================================
// Update
// ============================================================================

/// One script applying every recognized change
fn update_script(vm: &MachineResource, ctx: &mut HandlerContext) -> Script {
    let name = vm.name.as_str();
    let mut script = Script::new();
    let mut memory = Command::new("Set-VMMemory").arg("VMName", name);
    let mut settings = Command::new("Set-VM").arg("Name", name);
    let mut firmware = Command::new("Set-VMFirmware").arg("VMName", name);
    let mut skipped = Vec::new();

    for (key, value) in &ctx.changes {
        match (key, value) {
            (PROCESSOR_COUNT, ChangeValue::Number(count)) => {
                script.push(
                    Command::new("Set-VMProcessor")
                        .arg("VMName", name)
                        .raw("Count", count),
                );
            }
            (MISSING_DISKS, ChangeValue::Text(commands)) => {
                for line in commands.lines() {
                    script.push_line(line);
                }
            }
            (MISSING_SWITCHES, ChangeValue::List(switches)) => {
                for switch in switches {
                    connect_switch(&mut script, name, switch);
                }
            }
            (MEMORY_STARTUP_BYTES, ChangeValue::Number(bytes)) => {
                memory = memory.raw("StartupBytes", bytes);
            }
            (DYNAMIC_MEMORY_ENABLED, ChangeValue::Bool(enabled)) => {
                memory = memory.bool("DynamicMemoryEnabled", *enabled);
            }
            (MEMORY_MINIMUM_BYTES, ChangeValue::Number(bytes)) => {
                memory = memory.raw("MinimumBytes", bytes);
            }
            (MEMORY_MAXIMUM_BYTES, ChangeValue::Number(bytes)) => {
                memory = memory.raw("MaximumBytes", bytes);
            }
            (AUTOMATIC_START_ACTION, ChangeValue::Text(action)) => {
                settings = settings.raw("AutomaticStartAction", action);
            }
            (AUTOMATIC_STOP_ACTION, ChangeValue::Text(action)) => {
                settings = settings.raw("AutomaticStopAction", action);
            }
            (AUTOMATIC_START_DELAY, ChangeValue::Number(delay)) => {
                settings = settings.raw("AutomaticStartDelay", delay);
            }
            (SECURE_BOOT, ChangeValue::Bool(enabled)) => {
                firmware = firmware.raw("EnableSecureBoot", on_off(*enabled));
            }
            (SECURE_BOOT_TEMPLATE, ChangeValue::Text(_)) => {
                firmware = firmware.raw("SecureBootTemplateId", UEFI_CA_TEMPLATE_ID);
            }
            _ => skipped.push(key.to_string()),
        }
    }

    for command in [memory, settings, firmware] {
        if command.clause_count() > 1 {
            script.push(command);
        }
    }

    for key in skipped {
        if key == PATH {
            ctx.warn(format!("path of {} is not corrected", name));
        } else {
            ctx.debug(format!("ignoring change {}", key));
        }
    }
    script
}

impl Handler<Resource> for MachineHandler {
    fn resource_type(&self) -> &'static str {
        kind::MACHINE
    }

    fn read(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let vm = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &vm.host.target);

        let output = session.query(&Command::new("Get-VM").arg("Name", &vm.name).to_json())?;
        if machine_absent(&output) {
            ctx.debug(format!("machine {} not found", vm.name));
            return Ok(());
        }
        let output = session.ensure_success(output)?;
        let info: VmInfo = observed::parse("machine", output.text())?;
        ctx.extras
            .insert("info".to_string(), serde_json::to_value(&info)?);
        ctx.deployed = true;

        diff_path(vm, &info, ctx);
        diff_processor(&session, vm, ctx)?;
        ctx.debug(format!(
            "boot device {} accepted as declared; drift detection not implemented",
            vm.boot_device.as_str()
        ));
        diff_disks(&session, vm, ctx)?;
        diff_switches(&session, vm, ctx)?;
        diff_memory(&session, vm, ctx)?;
        diff_automatic_actions(&session, vm, ctx)?;
        diff_secure_boot(&session, vm, self.secure_boot_check, ctx)?;
        Ok(())
    }

    fn create(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let vm = self.expect(resource)?;
        let session = Session::new(self.exec.as_ref(), &vm.host.target);

        let script = create_script(vm, &ctx.task_id)?;
        session.script(&script)?;
        ctx.info(format!("created machine {}", vm.name));
        ctx.deployed = true;
        Ok(())
    }

    fn update(&self, resource: &Resource, ctx: &mut HandlerContext) -> Result<()> {
        let vm = self.expect(resource)?;

        let script = update_script(vm, ctx);
        if !script.is_empty() {
            let session = Session::new(self.exec.as_ref(), &vm.host.target);
            session.script(&script)?;
        }
        ctx.deployed = true;
        Ok(())
    }
}
