//! Absence detection.
//!
//! Hyper-V cmdlets report a missing object as an error message, not as an
//! empty result. Each resource kind has exactly one phrase that means
//! "absent"; any other error output is a real failure.

use pwshkit::Output;

const SWITCH_NOT_FOUND: &str = "Hyper-V was unable to find a virtual switch";
const DISK_NOT_FOUND: &str = "not an existing virtual hard disk file";
const MACHINE_NOT_FOUND: &str = "unable to find a virtual machine";

/// `Get-VMSwitch` found no switch with that name
pub fn switch_absent(output: &Output) -> bool {
    output.contains(SWITCH_NOT_FOUND)
}

/// `Get-VHD` found no disk at that path
pub fn disk_absent(output: &Output) -> bool {
    output.contains(DISK_NOT_FOUND)
}

/// `Get-VM` found no machine with that name
pub fn machine_absent(output: &Output) -> bool {
    output.contains(MACHINE_NOT_FOUND)
}
