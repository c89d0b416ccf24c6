//! Desired-state descriptors.
//!
//! Descriptors are plain data built by the document loader before any
//! reconciliation runs, and are never mutated afterwards. Resources that
//! belong to a host hold a shared reference to it.

use pwshkit::Target;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::units::parse_size;

// ============================================================================
// Host
// ============================================================================

/// Operating system family reported by a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OsFamily {
    Windows,
    Other,
}

/// What a host reports about its operating system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsFingerprint {
    pub family: OsFamily,
    /// Free-form version string, e.g. "Microsoft Windows 10 Pro"
    pub version: String,
}

impl OsFingerprint {
    /// Classify a reported OS caption
    pub fn from_caption(caption: &str) -> Self {
        let caption = caption.trim();
        let family = if caption.to_ascii_lowercase().contains("windows") {
            OsFamily::Windows
        } else {
            OsFamily::Other
        };
        Self {
            family,
            version: caption.to_string(),
        }
    }

    pub fn is_windows(&self) -> bool {
        self.family == OsFamily::Windows
    }
}

/// A hypervisor host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResource {
    /// Name the rest of the document refers to this host by
    pub name: String,
    /// Where commands for this host are sent
    pub target: Target,
    /// Operating system, when already known; detected otherwise
    pub os: Option<OsFingerprint>,
    /// Whether the Hyper-V role may be installed if missing
    pub install: bool,
}

impl HostResource {
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            target,
            os: None,
            install: false,
        }
    }

    pub fn with_os(mut self, caption: &str) -> Self {
        self.os = Some(OsFingerprint::from_caption(caption));
        self
    }

    pub fn with_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }
}

// ============================================================================
// Switch
// ============================================================================

/// Hyper-V virtual switch type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    Internal,
    Private,
    External,
}

impl SwitchType {
    /// Value of `-SwitchType`
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchType::Internal => "Internal",
            SwitchType::Private => "Private",
            SwitchType::External => "External",
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            SwitchType::Internal => "InternalSwitch",
            SwitchType::Private => "PrivateSwitch",
            SwitchType::External => "ExternalSwitch",
        }
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings only an external switch has
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSettings {
    /// Physical adapter the switch binds to
    pub net_adapter_name: String,
    pub allow_management_os: Option<bool>,
    pub enable_iov: Option<bool>,
}

/// Closed set of switch variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchKind {
    /// Connects VMs with the host and with each other
    Internal,
    /// Connects VMs with each other only
    Private,
    /// Connects VMs with a physical network adapter
    External(ExternalSettings),
}

impl SwitchKind {
    pub fn switch_type(&self) -> SwitchType {
        match self {
            SwitchKind::Internal => SwitchType::Internal,
            SwitchKind::Private => SwitchType::Private,
            SwitchKind::External(_) => SwitchType::External,
        }
    }
}

/// A virtual switch, keyed by name on its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchResource {
    pub name: String,
    pub host: Arc<HostResource>,
    pub kind: SwitchKind,
}

impl SwitchResource {
    pub fn internal(name: impl Into<String>, host: Arc<HostResource>) -> Self {
        Self {
            name: name.into(),
            host,
            kind: SwitchKind::Internal,
        }
    }

    pub fn private(name: impl Into<String>, host: Arc<HostResource>) -> Self {
        Self {
            name: name.into(),
            host,
            kind: SwitchKind::Private,
        }
    }

    pub fn external(
        name: impl Into<String>,
        host: Arc<HostResource>,
        net_adapter_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host,
            kind: SwitchKind::External(ExternalSettings {
                net_adapter_name: net_adapter_name.into(),
                allow_management_os: None,
                enable_iov: None,
            }),
        }
    }

    pub fn switch_type(&self) -> SwitchType {
        self.kind.switch_type()
    }

    pub fn external_settings(&self) -> Option<&ExternalSettings> {
        match &self.kind {
            SwitchKind::External(settings) => Some(settings),
            _ => None,
        }
    }
}

// ============================================================================
// Disk
// ============================================================================

/// VHD allocation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskType {
    Fixed,
    #[default]
    Dynamic,
}

impl DiskType {
    /// `New-VHD` flag selecting this type
    pub fn flag(&self) -> &'static str {
        match self {
            DiskType::Fixed => "Fixed",
            DiskType::Dynamic => "Dynamic",
        }
    }
}

/// A virtual hard disk file, keyed by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskResource {
    pub path: String,
    pub host: Arc<HostResource>,
    /// Human-readable size, e.g. "40GB"
    pub size: String,
    pub disk_type: DiskType,
}

impl DiskResource {
    pub fn new(
        path: impl Into<String>,
        host: Arc<HostResource>,
        size: impl Into<String>,
        disk_type: DiskType,
    ) -> Self {
        Self {
            path: path.into(),
            host,
            size: size.into(),
            disk_type,
        }
    }

    pub fn size_bytes(&self) -> Result<u64> {
        parse_size(&self.size)
    }
}

// ============================================================================
// Machine
// ============================================================================

/// First boot device of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootDevice {
    Cd,
    #[default]
    Vhd,
    NetworkAdapter,
    Floppy,
    Ide,
    LegacyNetworkAdapter,
}

impl BootDevice {
    /// Value of `-BootDevice`
    pub fn as_str(&self) -> &'static str {
        match self {
            BootDevice::Cd => "CD",
            BootDevice::Vhd => "VHD",
            BootDevice::NetworkAdapter => "NetworkAdapter",
            BootDevice::Floppy => "Floppy",
            BootDevice::Ide => "IDE",
            BootDevice::LegacyNetworkAdapter => "LegacyNetworkAdapter",
        }
    }
}

/// What a machine does when the host starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartAction {
    Nothing,
    StartIfRunning,
    Start,
}

impl StartAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartAction::Nothing => "Nothing",
            StartAction::StartIfRunning => "StartIfRunning",
            StartAction::Start => "Start",
        }
    }
}

/// What a machine does when the host stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopAction {
    TurnOff,
    Save,
    ShutDown,
}

impl StopAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopAction::TurnOff => "TurnOff",
            StopAction::Save => "Save",
            StopAction::ShutDown => "ShutDown",
        }
    }
}

/// A virtual machine, keyed by name on its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineResource {
    pub name: String,
    pub host: Arc<HostResource>,
    /// Directory holding the machine's configuration files
    pub path: Option<String>,
    pub cpus: u32,
    pub boot_device: BootDevice,
    /// Attached disks, in attach order
    pub disks: Vec<Arc<DiskResource>>,
    /// Connected switches, in connect order
    pub switches: Vec<Arc<SwitchResource>>,
    /// ISO mounted as optical media
    pub install_media: Option<String>,
    pub startup_ram: String,
    pub min_ram: Option<String>,
    pub max_ram: Option<String>,
    pub dynamic_ram: bool,
    pub start_action: Option<StartAction>,
    pub stop_action: Option<StopAction>,
    /// Seconds to wait before an automatic start
    pub start_delay: Option<u32>,
    pub secure_boot: Option<bool>,
    pub secure_boot_template: Option<String>,
}

impl MachineResource {
    pub fn new(name: impl Into<String>, host: Arc<HostResource>) -> Self {
        Self {
            name: name.into(),
            host,
            path: None,
            cpus: 1,
            boot_device: BootDevice::default(),
            disks: Vec::new(),
            switches: Vec::new(),
            install_media: None,
            startup_ram: "1GB".to_string(),
            min_ram: None,
            max_ram: None,
            dynamic_ram: false,
            start_action: None,
            stop_action: None,
            start_delay: None,
            secure_boot: None,
            secure_boot_template: None,
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// Any declared resource, dispatched by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Host(Arc<HostResource>),
    Switch(Arc<SwitchResource>),
    Disk(Arc<DiskResource>),
    Machine(Arc<MachineResource>),
}

/// Resource type keys
pub mod kind {
    pub const HOST: &str = "HyperVHost";
    pub const DISK: &str = "VirtualDisk";
    pub const MACHINE: &str = "VirtualMachine";
}

impl Resource {
    /// The host this resource lives on
    pub fn host(&self) -> &HostResource {
        match self {
            Resource::Host(host) => host,
            Resource::Switch(switch) => &switch.host,
            Resource::Disk(disk) => &disk.host,
            Resource::Machine(vm) => &vm.host,
        }
    }
}

impl declarative::Resource for Resource {
    fn id(&self) -> String {
        match self {
            Resource::Host(host) => host.name.clone(),
            Resource::Switch(switch) => switch.name.clone(),
            Resource::Disk(disk) => disk.path.clone(),
            Resource::Machine(vm) => vm.name.clone(),
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            Resource::Host(_) => kind::HOST,
            Resource::Switch(switch) => switch.switch_type().resource_type(),
            Resource::Disk(_) => kind::DISK,
            Resource::Machine(_) => kind::MACHINE,
        }
    }

    fn description(&self) -> String {
        match self {
            Resource::Host(host) => format!("Hyper-V host {} ({})", host.name, host.target),
            Resource::Switch(switch) => format!(
                "{} switch {} on {}",
                switch.switch_type(),
                switch.name,
                switch.host.name
            ),
            Resource::Disk(disk) => format!(
                "{} disk {} ({}) on {}",
                disk.disk_type.flag(),
                disk.path,
                disk.size,
                disk.host.name
            ),
            Resource::Machine(vm) => format!("Virtual machine {} on {}", vm.name, vm.host.name),
        }
    }
}
