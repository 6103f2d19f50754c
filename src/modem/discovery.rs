//! AT-port discovery.
//!
//! The AIR780E enumerates as a composite USB device with several tty
//! interfaces; only the one whose USB interface string is `AT` accepts
//! commands. Candidates come from the stable `/dev/serial/by-id` symlinks and
//! are confirmed through sysfs.
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::DeviceConfig;
use crate::error::{BridgeError, Result};

/// Levels above the tty's `device` link searched for an `interface` file.
const INTERFACE_SEARCH_DEPTH: usize = 3;

/// Resolved device paths whose USB interface matches `cfg.interface`, sorted.
/// A missing by-id directory means no devices, not an error.
pub fn list_at_devices(cfg: &DeviceConfig) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(&cfg.by_id_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(BridgeError::Discovery(e)),
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(&cfg.descriptor_prefix) {
            continue;
        }
        let dev_path = match fs::canonicalize(entry.path()) {
            Ok(p) => p,
            Err(e) => {
                debug!("skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let interface = read_interface(&cfg.sysfs_tty_dir, &dev_path);
        debug!(
            "candidate {} -> {} (interface {:?})",
            entry.path().display(),
            dev_path.display(),
            interface
        );
        if interface.trim().eq_ignore_ascii_case(cfg.interface.trim()) {
            found.push(dev_path);
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

/// Best-effort USB interface string for a tty device; empty when unknown.
pub fn read_interface(sysfs_tty_dir: &Path, dev_path: &Path) -> String {
    let Some(tty_name) = dev_path.file_name() else {
        return String::new();
    };
    let device_link = sysfs_tty_dir.join(tty_name).join("device");
    // Follow the sysfs link so the parents are the real USB hierarchy.
    let device_dir = fs::canonicalize(&device_link).unwrap_or(device_link);

    std::iter::successors(Some(device_dir.as_path()), |p| p.parent())
        .take(INTERFACE_SEARCH_DEPTH + 1)
        .find_map(|dir| {
            let text = fs::read_to_string(dir.join("interface")).ok()?;
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_default()
}

/// Pick the port to use: the explicit one if given, otherwise the single
/// discovered AT device.
pub fn choose_port(explicit: Option<&str>, cfg: &DeviceConfig) -> Result<String> {
    if let Some(port) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(port.to_string());
    }
    let mut ports = list_at_devices(cfg)?;
    match ports.len() {
        0 => Err(BridgeError::NoDevice),
        1 => Ok(ports.remove(0).display().to_string()),
        _ => Err(BridgeError::AmbiguousDevice(
            ports
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}
