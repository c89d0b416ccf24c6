//! `hvconverge validate`

use anyhow::Result;

use super::load;
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let loaded = load(ctx)?;
    let doc = &loaded.document;

    ui::success(&format!("{} is valid", loaded.path.display()));
    if !ctx.quiet {
        ui::kv("Hosts", &doc.hosts.len().to_string());
        ui::kv("Switches", &doc.switches.len().to_string());
        ui::kv("Disks", &doc.disks.len().to_string());
        ui::kv("Machines", &doc.machines.len().to_string());
        ui::kv(
            "Secure boot check",
            &format!("{:?}", doc.settings.secure_boot_check).to_lowercase(),
        );
    }
    if doc.is_empty() {
        ui::warn("The document declares no resources");
    }
    Ok(())
}
