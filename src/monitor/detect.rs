//! Monitor enumeration through compositor subprocesses
//!
//! Probes niri, sway, and hyprland in that order. Each compositor exposes a
//! JSON query command; the first one that responds supplies the output list.

use crate::io::error::{PipelineError, Result};
use crate::monitor::Monitor;
use serde_json::Value;
use std::process::Command;

/// One probe: command line plus a parser for its JSON output
struct CompositorProbe {
    name: &'static str,
    command: &'static [&'static str],
    parse: fn(&Value) -> Vec<Monitor>,
}

const PROBES: &[CompositorProbe] = &[
    CompositorProbe {
        name: "niri",
        command: &["niri", "msg", "--json", "outputs"],
        parse: parse_niri,
    },
    CompositorProbe {
        name: "sway",
        command: &["swaymsg", "-t", "get_outputs", "-r"],
        parse: parse_sway,
    },
    CompositorProbe {
        name: "hyprland",
        command: &["hyprctl", "-j", "monitors"],
        parse: parse_hyprland,
    },
];

/// Enumerate connected monitors from the running compositor
///
/// # Errors
///
/// Returns `MonitorDetection` when no supported compositor responds or the
/// responding compositor reports no usable outputs.
pub fn list_connected() -> Result<Vec<Monitor>> {
    let mut failures = Vec::new();

    for probe in PROBES {
        match run_probe(probe) {
            Ok(monitors) if !monitors.is_empty() => {
                tracing::info!(
                    compositor = probe.name,
                    count = monitors.len(),
                    "detected monitors"
                );
                return Ok(monitors);
            }
            Ok(_) => failures.push(format!("{}: no active outputs", probe.name)),
            Err(reason) => failures.push(format!("{}: {reason}", probe.name)),
        }
    }

    Err(PipelineError::MonitorDetection {
        reason: format!(
            "no supported compositor responded (tried niri, sway, hyprland): {}",
            failures.join("; ")
        ),
    })
}

fn run_probe(probe: &CompositorProbe) -> std::result::Result<Vec<Monitor>, String> {
    let output = Command::new(probe.command[0])
        .args(&probe.command[1..])
        .output()
        .map_err(|e| format!("cannot run '{}': {e}", probe.command.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "'{}' exited with {}: {}",
            probe.command.join(" "),
            output.status,
            stderr.trim()
        ));
    }

    let value: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| format!("invalid JSON from '{}': {e}", probe.command.join(" ")))?;
    Ok((probe.parse)(&value))
}

/// Parse `niri msg --json outputs`: an object keyed by connector name
pub fn parse_niri(value: &Value) -> Vec<Monitor> {
    let Some(outputs) = value.as_object() else {
        return Vec::new();
    };

    outputs
        .iter()
        .filter_map(|(name, info)| {
            let modes = info.get("modes")?.as_array()?;
            let current = info.get("current_mode")?.as_u64()? as usize;
            let mode = modes.get(current)?;
            let width = mode.get("width")?.as_u64()?;
            let height = mode.get("height")?.as_u64()?;
            Some(Monitor {
                name: name.clone(),
                resolution: format!("{width}x{height}"),
            })
        })
        .collect()
}

/// Parse `swaymsg -t get_outputs -r`: an array of output objects
pub fn parse_sway(value: &Value) -> Vec<Monitor> {
    let Some(outputs) = value.as_array() else {
        return Vec::new();
    };

    outputs
        .iter()
        .filter(|info| info.get("active").and_then(Value::as_bool).unwrap_or(true))
        .filter_map(|info| {
            let name = info.get("name")?.as_str()?;
            let mode = info.get("current_mode")?;
            let width = mode.get("width")?.as_u64()?;
            let height = mode.get("height")?.as_u64()?;
            Some(Monitor {
                name: name.to_string(),
                resolution: format!("{width}x{height}"),
            })
        })
        .collect()
}

/// Parse `hyprctl -j monitors`: an array with top-level width/height
pub fn parse_hyprland(value: &Value) -> Vec<Monitor> {
    let Some(outputs) = value.as_array() else {
        return Vec::new();
    };

    outputs
        .iter()
        .filter_map(|info| {
            let name = info.get("name")?.as_str()?;
            let width = info.get("width")?.as_u64()?;
            let height = info.get("height")?.as_u64()?;
            Some(Monitor {
                name: name.to_string(),
                resolution: format!("{width}x{height}"),
            })
        })
        .collect()
}
