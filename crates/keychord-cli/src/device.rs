//! Device enumeration

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use evdev::Device;

/// Information about an input device
#[derive(Debug)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub keyboard: bool,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "3434:0361")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// Enumerate all input devices
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").context("Failed to read /dev/input")? {
        let entry = entry?;
        let path = entry.path();

        // Only look at event* devices
        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("event"))
        {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let id = device.input_id();
                devices.push(DeviceInfo {
                    name: device.name().unwrap_or("Unknown").to_string(),
                    vendor: id.vendor(),
                    product: id.product(),
                    keyboard: is_keyboard(&device),
                    path,
                });
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .is_some_and(|keys| keys.contains(evdev::Key::KEY_A))
}

/// Open a device for listening, refusing anything that is not a keyboard.
pub fn open_keyboard(path: &Path) -> Result<Device> {
    let device = Device::open(path)
        .with_context(|| format!("Failed to open input device {}", path.display()))?;

    if !is_keyboard(&device) {
        bail!(
            "{} ({}) is not a keyboard",
            path.display(),
            device.name().unwrap_or("Unknown")
        );
    }

    tracing::info!(
        "Opened keyboard '{}' at {}",
        device.name().unwrap_or("Unknown"),
        path.display()
    );
    Ok(device)
}
