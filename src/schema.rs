use anyhow::{Context, Result, bail};
use hyperv::{
    BootDevice, DiskResource, DiskType, ExternalSettings, HostResource, MachineResource, Resource,
    SecureBootCheck, StartAction, StopAction, SwitchKind, SwitchResource, SwitchType, parse_size,
};
use pwshkit::Target;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Document Schema
// ============================================================================

/// The desired state of one or more Hyper-V hosts
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub hosts: Vec<HostSpec>,

    #[serde(default)]
    pub switches: Vec<SwitchSpec>,

    #[serde(default)]
    pub disks: Vec<DiskSpec>,

    #[serde(default)]
    pub machines: Vec<MachineSpec>,
}

/// Reconciliation settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// How secure-boot state is compared on existing machines
    #[serde(default)]
    pub secure_boot_check: SecureBootCheck,
}

/// A hypervisor host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub name: String,

    /// Host name or address; `localhost` runs PowerShell locally
    pub address: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Operating system caption; detected when omitted
    #[serde(default)]
    pub os: Option<String>,

    /// Whether the Hyper-V role may be installed if missing
    #[serde(default)]
    pub install: bool,
}

/// A virtual switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchSpec {
    pub name: String,
    pub host: String,

    #[serde(rename = "type")]
    pub switch_type: SwitchType,

    /// Physical adapter (external switches only)
    #[serde(default)]
    pub net_adapter_name: Option<String>,

    #[serde(default)]
    pub allow_management_os: Option<bool>,

    #[serde(default)]
    pub enable_iov: Option<bool>,
}

/// A virtual hard disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    pub path: String,
    pub host: String,
    pub size: String,

    #[serde(rename = "type", default)]
    pub disk_type: DiskType,
}

/// A virtual machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    pub name: String,
    pub host: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_cpus")]
    pub cpus: u32,

    #[serde(default)]
    pub boot_device: BootDevice,

    /// Disk paths, in attach order
    #[serde(default)]
    pub disks: Vec<String>,

    /// Switch names, in connect order
    #[serde(default)]
    pub switches: Vec<String>,

    #[serde(default)]
    pub install_media: Option<String>,

    #[serde(default = "default_startup_ram")]
    pub startup_ram: String,

    #[serde(default)]
    pub dynamic_ram: bool,

    #[serde(default)]
    pub min_ram: Option<String>,

    #[serde(default)]
    pub max_ram: Option<String>,

    #[serde(default)]
    pub start_action: Option<StartAction>,

    #[serde(default)]
    pub stop_action: Option<StopAction>,

    /// Seconds
    #[serde(default)]
    pub start_delay: Option<u32>,

    #[serde(default)]
    pub secure_boot: Option<bool>,

    #[serde(default)]
    pub secure_boot_template: Option<String>,
}

fn default_cpus() -> u32 {
    1
}

fn default_startup_ram() -> String {
    "1GB".to_string()
}

// ============================================================================
// Loading
// ============================================================================

impl Document {
    /// Load a document from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid document: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML format")
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.hosts.len() + self.switches.len() + self.disks.len() + self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Validation
// ============================================================================

impl Document {
    /// Check names, references and sizes
    pub fn validate(&self) -> Result<()> {
        let mut hosts = HashSet::new();
        for host in &self.hosts {
            host.validate()
                .with_context(|| format!("Invalid host '{}'", host.name))?;
            if !hosts.insert(host.name.as_str()) {
                bail!("Duplicate host '{}'", host.name);
            }
        }

        let mut switches = HashSet::new();
        for switch in &self.switches {
            switch
                .validate(&hosts)
                .with_context(|| format!("Invalid switch '{}'", switch.name))?;
            if !switches.insert((switch.host.as_str(), switch.name.as_str())) {
                bail!("Duplicate switch '{}' on host '{}'", switch.name, switch.host);
            }
        }

        let mut disks = HashSet::new();
        for disk in &self.disks {
            disk.validate(&hosts)
                .with_context(|| format!("Invalid disk '{}'", disk.path))?;
            if !disks.insert((disk.host.as_str(), disk.path.as_str())) {
                bail!("Duplicate disk '{}' on host '{}'", disk.path, disk.host);
            }
        }

        let mut machines = HashSet::new();
        for machine in &self.machines {
            machine
                .validate(&hosts, &switches, &disks)
                .with_context(|| format!("Invalid machine '{}'", machine.name))?;
            if !machines.insert((machine.host.as_str(), machine.name.as_str())) {
                bail!(
                    "Duplicate machine '{}' on host '{}'",
                    machine.name,
                    machine.host
                );
            }
        }

        Ok(())
    }
}

fn require_host(hosts: &HashSet<&str>, host: &str) -> Result<()> {
    if !hosts.contains(host) {
        bail!("Unknown host '{}'", host);
    }
    Ok(())
}

fn require_size(field: &str, value: &str) -> Result<u64> {
    parse_size(value).with_context(|| format!("Invalid {}", field))
}

impl HostSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Host name cannot be empty");
        }
        if self.address.trim().is_empty() {
            bail!("Host address cannot be empty");
        }
        Ok(())
    }
}

impl SwitchSpec {
    pub fn validate(&self, hosts: &HashSet<&str>) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Switch name cannot be empty");
        }
        require_host(hosts, &self.host)?;

        let adapter = self.net_adapter_name.as_deref().unwrap_or_default();
        if self.switch_type == SwitchType::External && adapter.trim().is_empty() {
            bail!("External switch requires net_adapter_name");
        }
        if self.switch_type != SwitchType::External
            && (self.net_adapter_name.is_some()
                || self.allow_management_os.is_some()
                || self.enable_iov.is_some())
        {
            log::warn!(
                "switch '{}': adapter settings are ignored for {} switches",
                self.name,
                self.switch_type
            );
        }
        Ok(())
    }
}

impl DiskSpec {
    pub fn validate(&self, hosts: &HashSet<&str>) -> Result<()> {
        if self.path.trim().is_empty() {
            bail!("Disk path cannot be empty");
        }
        require_host(hosts, &self.host)?;
        require_size("size", &self.size)?;
        Ok(())
    }
}

impl MachineSpec {
    pub fn validate(
        &self,
        hosts: &HashSet<&str>,
        switches: &HashSet<(&str, &str)>,
        disks: &HashSet<(&str, &str)>,
    ) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Machine name cannot be empty");
        }
        require_host(hosts, &self.host)?;

        if self.cpus == 0 {
            bail!("cpus must be at least 1");
        }

        for path in &self.disks {
            if !disks.contains(&(self.host.as_str(), path.as_str())) {
                bail!("Unknown disk '{}' on host '{}'", path, self.host);
            }
        }
        for name in &self.switches {
            if !switches.contains(&(self.host.as_str(), name.as_str())) {
                bail!("Unknown switch '{}' on host '{}'", name, self.host);
            }
        }

        require_size("startup_ram", &self.startup_ram)?;
        let min = self
            .min_ram
            .as_deref()
            .map(|v| require_size("min_ram", v))
            .transpose()?;
        let max = self
            .max_ram
            .as_deref()
            .map(|v| require_size("max_ram", v))
            .transpose()?;

        if self.dynamic_ram {
            match (min, max) {
                (Some(min), Some(max)) if min > max => {
                    bail!("min_ram cannot be larger than max_ram")
                }
                (Some(_), Some(_)) => {}
                _ => bail!("dynamic_ram requires min_ram and max_ram"),
            }
        }

        if self.secure_boot_template.is_some() && self.secure_boot.is_none() {
            log::warn!(
                "machine '{}': secure_boot_template has no effect on create without secure_boot",
                self.name
            );
        }
        Ok(())
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl HostSpec {
    pub fn target(&self) -> Target {
        let mut target = Target::new(&self.address);
        target.user = self.user.clone();
        target.port = self.port;
        target
    }
}

impl Document {
    /// Build descriptors in document order: hosts, switches, disks, machines
    ///
    /// The document must have passed [`Document::validate`].
    pub fn resources(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::with_capacity(self.len());

        let mut hosts = HashMap::new();
        for spec in &self.hosts {
            let mut host = HostResource::new(&spec.name, spec.target()).with_install(spec.install);
            if let Some(os) = &spec.os {
                host = host.with_os(os);
            }
            let host = Arc::new(host);
            hosts.insert(spec.name.as_str(), host.clone());
            resources.push(Resource::Host(host));
        }
        let host = |name: &str| {
            hosts
                .get(name)
                .cloned()
                .with_context(|| format!("Unknown host '{}'", name))
        };

        let mut switches = HashMap::new();
        for spec in &self.switches {
            let kind = match spec.switch_type {
                SwitchType::Internal => SwitchKind::Internal,
                SwitchType::Private => SwitchKind::Private,
                SwitchType::External => SwitchKind::External(ExternalSettings {
                    net_adapter_name: spec.net_adapter_name.clone().unwrap_or_default(),
                    allow_management_os: spec.allow_management_os,
                    enable_iov: spec.enable_iov,
                }),
            };
            let switch = Arc::new(SwitchResource {
                name: spec.name.clone(),
                host: host(&spec.host)?,
                kind,
            });
            switches.insert((spec.host.as_str(), spec.name.as_str()), switch.clone());
            resources.push(Resource::Switch(switch));
        }

        let mut disks = HashMap::new();
        for spec in &self.disks {
            let disk = Arc::new(DiskResource::new(
                &spec.path,
                host(&spec.host)?,
                &spec.size,
                spec.disk_type,
            ));
            disks.insert((spec.host.as_str(), spec.path.as_str()), disk.clone());
            resources.push(Resource::Disk(disk));
        }

        for spec in &self.machines {
            let machine_disks = spec
                .disks
                .iter()
                .map(|path| {
                    disks
                        .get(&(spec.host.as_str(), path.as_str()))
                        .cloned()
                        .with_context(|| format!("Unknown disk '{}'", path))
                })
                .collect::<Result<Vec<_>>>()?;
            let machine_switches = spec
                .switches
                .iter()
                .map(|name| {
                    switches
                        .get(&(spec.host.as_str(), name.as_str()))
                        .cloned()
                        .with_context(|| format!("Unknown switch '{}'", name))
                })
                .collect::<Result<Vec<_>>>()?;

            resources.push(Resource::Machine(Arc::new(MachineResource {
                name: spec.name.clone(),
                host: host(&spec.host)?,
                path: spec.path.clone(),
                cpus: spec.cpus,
                boot_device: spec.boot_device,
                disks: machine_disks,
                switches: machine_switches,
                install_media: spec.install_media.clone(),
                startup_ram: spec.startup_ram.clone(),
                min_ram: spec.min_ram.clone(),
                max_ram: spec.max_ram.clone(),
                dynamic_ram: spec.dynamic_ram,
                start_action: spec.start_action,
                stop_action: spec.stop_action,
                start_delay: spec.start_delay,
                secure_boot: spec.secure_boot,
                secure_boot_template: spec.secure_boot_template.clone(),
            })));
        }

        Ok(resources)
    }
}

// ============================================================================
// Tests
// ============================================================================
