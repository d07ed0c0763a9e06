//! Frontend ini patching
//!
//! Binds the six joypad entries to physical key codes, places the window,
//! mutes sound and zeroes the joypad entries the swarm never presses.
//! Entries missing from the template are appended.

use std::collections::HashMap;

use entroswarm_common::{KeyBinding, Placement};

/// Joypad entries forced to 0
pub const DISABLED_ENTRIES: [&str; 5] = ["Joy0_L", "Joy0_R", "Joy0_Start", "Joy0_Select", "Joy0_GS"];

/// Entries written by [`patch_ini`], in append order
fn overrides(bindings: &[KeyBinding], placement: Placement) -> Vec<(String, String)> {
    let mut entries = vec![
        ("windowX".to_string(), placement.x.to_string()),
        ("windowY".to_string(), placement.y.to_string()),
    ];
    entries.extend(
        bindings
            .iter()
            .map(|b| (b.action.ini_key().to_string(), b.key.value.to_string())),
    );
    entries.push(("soundOff".to_string(), "1".to_string()));
    entries
}

fn entry_key(line: &str) -> &str {
    line.split('=').next().unwrap_or("").trim()
}

pub fn patch_ini(content: &str, bindings: &[KeyBinding], placement: Placement) -> String {
    let entries = overrides(bindings, placement);
    let lookup: HashMap<&str, &str> = entries
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let mut seen = Vec::new();
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            let key = entry_key(line);
            if let Some(value) = lookup.get(key) {
                seen.push(key.to_string());
                format!("{key}={value}")
            } else if DISABLED_ENTRIES.contains(&key) {
                format!("{key}=0")
            } else {
                line.to_string()
            }
        })
        .collect();

    for (key, value) in &entries {
        if !seen.contains(key) {
            lines.push(format!("{key}={value}"));
        }
    }

    let mut patched = lines.join("\n");
    patched.push('\n');
    patched
}

/// Whether `content` carries the placement and every binding
pub fn verify_ini(content: &str, bindings: &[KeyBinding], placement: Placement) -> bool {
    let written: HashMap<&str, &str> = content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    overrides(bindings, placement)
        .iter()
        .all(|(key, value)| written.get(key.as_str()) == Some(&value.as_str()))
}
