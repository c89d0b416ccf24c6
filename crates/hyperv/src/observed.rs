//! Observed state, as reported by the Hyper-V cmdlets.
//!
//! Each query pipes its result through `ConvertTo-Json`; the records below
//! keep only the fields the reconcilers compare. Every field is optional so
//! a property missing from the output is an explicit `None` rather than a
//! silent default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hyper-V optional feature is enabled
pub const FEATURE_STATE_INSTALLED: i64 = 2;

/// `Get-CimInstance Win32_OperatingSystem`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsInfo {
    pub caption: Option<String>,
    pub version: Option<String>,
}

/// `Get-WindowsOptionalFeature`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureInfo {
    pub feature_name: Option<String>,
    pub state: Option<i64>,
}

impl FeatureInfo {
    pub fn is_installed(&self) -> bool {
        self.state == Some(FEATURE_STATE_INSTALLED)
    }
}

/// `Get-VMSwitch`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwitchInfo {
    pub name: Option<String>,
    pub iov_enabled: Option<bool>,
    #[serde(rename = "AllowManagementOS")]
    pub allow_management_os: Option<bool>,
    pub net_adapter_interface_description: Option<String>,
}

/// `Get-VHD`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VhdInfo {
    pub path: Option<String>,
    /// 2 = Fixed, 3 = Dynamic, 4 = Differencing
    pub vhd_type: Option<i64>,
    pub size: Option<u64>,
    pub file_size: Option<u64>,
}

/// `Get-VM`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VmInfo {
    pub name: Option<String>,
    pub path: Option<String>,
    pub generation: Option<u32>,
}

/// `Get-VMProcessor`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessorInfo {
    pub count: Option<u32>,
}

/// One entry of `Get-VMHardDiskDrive`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HardDriveInfo {
    pub path: Option<String>,
    pub controller_number: Option<u32>,
    pub controller_location: Option<u32>,
}

/// One entry of `Get-VMNetworkAdapter`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterInfo {
    pub name: Option<String>,
    /// `None` when the adapter is not connected
    pub switch_name: Option<String>,
}

/// `Get-VMMemory`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemoryInfo {
    pub startup: Option<u64>,
    pub dynamic_memory_enabled: Option<bool>,
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Parse one JSON record
pub fn parse<T: DeserializeOwned>(what: &'static str, text: &str) -> Result<T> {
    serde_json::from_str(text.trim()).map_err(|source| Error::Parse { what, source })
}

/// Parse a JSON record list
///
/// `ConvertTo-Json` prints a bare object for a single result and nothing
/// at all for an empty one; both are accepted.
pub fn parse_list<T: DeserializeOwned>(what: &'static str, text: &str) -> Result<Vec<T>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: OneOrMany<T> =
        serde_json::from_str(text).map_err(|source| Error::Parse { what, source })?;
    Ok(match parsed {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}
