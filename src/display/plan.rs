//! Plan and volume display formatting

use std::path::Path;

use crate::plan::BackupUnit;
use crate::volume::{VolumeKind, VolumeState};

/// Format the units of a plan as a table
pub fn format_plan(units: &[BackupUnit]) -> String {
    if units.is_empty() {
        return "No backup units configured.".to_string();
    }

    let label_width = units
        .iter()
        .map(|u| u.label.display().to_string().len())
        .max()
        .unwrap_or(4)
        .max(4);

    let dst_width = units
        .iter()
        .map(|u| u.destination.display().to_string().len())
        .max()
        .unwrap_or(11)
        .max(11);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<label_width$}  {:<9}  {:<dst_width$}  {}\n",
        "Unit",
        "Frequency",
        "Destination",
        "Excludes",
        label_width = label_width,
        dst_width = dst_width,
    ));
    output.push_str(&format!(
        "{:-<label_width$}  {:-<9}  {:-<dst_width$}  {:-<8}\n",
        "",
        "",
        "",
        "",
        label_width = label_width,
        dst_width = dst_width,
    ));

    for unit in units {
        output.push_str(&format!(
            "{:<label_width$}  {:<9}  {:<dst_width$}  {}\n",
            unit.label.display().to_string(),
            unit.policy.as_str(),
            unit.destination.display().to_string(),
            unit.excludes.join(", "),
            label_width = label_width,
            dst_width = dst_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} unit(s)\n", units.len()));
    output
}

/// Format the state of one volume
pub fn format_volume_status(
    name: &str,
    kind: &VolumeKind,
    state: VolumeState,
    mount_point: &Path,
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Volume:      {}\n", name));
    output.push_str(&format!("Kind:        {}\n", kind));
    output.push_str(&format!("State:       {}\n", state));
    output.push_str(&format!("Mount point: {}\n", mount_point.display()));
    output
}
