//! Device enumeration and selection

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use evdev::Device;

/// Information about an input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub keyboard: bool,
}

impl DeviceInfo {
    fn from_device(path: PathBuf, device: &Device) -> Self {
        let id = device.input_id();
        Self {
            path,
            name: device.name().unwrap_or("Unknown").to_string(),
            vendor: id.vendor(),
            product: id.product(),
            keyboard: is_keyboard(device),
        }
    }

    /// Get vendor:product string (e.g., "05f3:00ff")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }

    pub fn kind(&self) -> &'static str {
        if self.keyboard {
            "keyboard"
        } else {
            "other"
        }
    }
}

fn is_event_node(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("event"))
        .unwrap_or(false)
}

/// The N of `/dev/input/eventN`
fn event_index(path: &Path) -> Option<u32> {
    path.file_name()?.to_str()?.strip_prefix("event")?.parse().ok()
}

/// Order devices by event number, so `event2` comes before `event10`
fn sort_devices(devices: &mut [DeviceInfo]) {
    devices.sort_by(|a, b| {
        (event_index(&a.path), &a.path).cmp(&(event_index(&b.path), &b.path))
    });
}

/// Enumerate all readable input devices, ordered by event number
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").context("Failed to read /dev/input")? {
        let path = entry?.path();
        if !is_event_node(&path) {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => devices.push(DeviceInfo::from_device(path, &device)),
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    sort_devices(&mut devices);
    Ok(devices)
}

/// Check if a device is a keyboard
///
/// Foot switches usually present themselves as keyboards, so anything that
/// reports letter keys qualifies.
pub fn is_keyboard(device: &Device) -> bool {
    device
        .supported_events()
        .contains(evdev::EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false)
}

/// Which input device feeds the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// An explicit evdev node, e.g. `/dev/input/event5`
    Path(PathBuf),
    /// `vendor:product` in hex, e.g. `05f3:00ff`
    VendorProduct(u16, u16),
    /// Exact device name as reported by the kernel
    Name(String),
    FirstKeyboard,
}

impl DeviceSelector {
    /// Interpret a `--device` argument or the config's `device` option.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::FirstKeyboard;
        };

        if value.starts_with('/') {
            return Self::Path(PathBuf::from(value));
        }

        if let Some((vendor, product)) = value.split_once(':') {
            if vendor.len() == 4 && product.len() == 4 {
                if let (Ok(vendor), Ok(product)) = (
                    u16::from_str_radix(vendor, 16),
                    u16::from_str_radix(product, 16),
                ) {
                    return Self::VendorProduct(vendor, product);
                }
            }
        }

        Self::Name(value.to_string())
    }

    pub fn matches(&self, info: &DeviceInfo) -> bool {
        match self {
            Self::Path(path) => &info.path == path,
            Self::VendorProduct(vendor, product) => {
                info.vendor == *vendor && info.product == *product
            }
            Self::Name(name) => &info.name == name,
            Self::FirstKeyboard => info.keyboard,
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path {}", path.display()),
            Self::VendorProduct(vendor, product) => {
                write!(f, "id {:04x}:{:04x}", vendor, product)
            }
            Self::Name(name) => write!(f, "name '{}'", name),
            Self::FirstKeyboard => write!(f, "first keyboard"),
        }
    }
}

/// Open the single device the selector points at.
///
/// An explicit path is opened directly; everything else is resolved against
/// `/dev/input`. The device is only read, never grabbed, so the foot switch
/// keeps typing into whatever application has focus.
pub fn select_device(selector: &DeviceSelector) -> Result<(Device, DeviceInfo)> {
    if let DeviceSelector::Path(path) = selector {
        let device = Device::open(path)
            .with_context(|| format!("Failed to open device at {}", path.display()))?;
        let info = DeviceInfo::from_device(path.clone(), &device);
        return Ok((device, info));
    }

    let devices = enumerate_devices()?;
    let Some(info) = devices.into_iter().find(|info| selector.matches(info)) else {
        bail!(
            "No input device matches {}. Run `pedal-feedback devices` to list devices.",
            selector
        );
    };

    let device = Device::open(&info.path)
        .with_context(|| format!("Failed to open device '{}' at {}", info.name, info.path.display()))?;

    Ok((device, info))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, name: &str, vendor: u16, product: u16, keyboard: bool) -> DeviceInfo {
        DeviceInfo {
            path: PathBuf::from(path),
            name: name.to_string(),
            vendor,
            product,
            keyboard,
        }
    }

    #[test]
    fn test_vendor_product_format() {
        let device = info("/dev/input/event3", "Foot Switch", 0x05f3, 0x00ff, true);
        assert_eq!(device.vendor_product(), "05f3:00ff");
    }

    #[test]
    fn test_kind_label() {
        assert_eq!(info("/dev/input/event3", "Pedal", 1, 2, true).kind(), "keyboard");
        assert_eq!(info("/dev/input/event4", "Mouse", 1, 2, false).kind(), "other");
    }

    #[test]
    fn test_devices_sorted_by_event_number() {
        let mut devices = vec![
            info("/dev/input/event10", "Keyboard", 1, 1, true),
            info("/dev/input/event2", "Pedal", 2, 2, true),
            info("/dev/input/event1", "Power Button", 3, 3, false),
        ];
        sort_devices(&mut devices);

        let paths: Vec<_> = devices.iter().map(|d| d.path.to_str().unwrap()).collect();
        assert_eq!(
            paths,
            vec!["/dev/input/event1", "/dev/input/event2", "/dev/input/event10"]
        );

        let first = devices
            .iter()
            .find(|d| DeviceSelector::FirstKeyboard.matches(d))
            .unwrap();
        assert_eq!(first.name, "Pedal");
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(DeviceSelector::parse(None), DeviceSelector::FirstKeyboard);
        assert_eq!(DeviceSelector::parse(Some("  ")), DeviceSelector::FirstKeyboard);
        assert_eq!(
            DeviceSelector::parse(Some("/dev/input/event5")),
            DeviceSelector::Path(PathBuf::from("/dev/input/event5"))
        );
        assert_eq!(
            DeviceSelector::parse(Some("05f3:00FF")),
            DeviceSelector::VendorProduct(0x05f3, 0x00ff)
        );
        assert_eq!(
            DeviceSelector::parse(Some("PCsensor FootSwitch")),
            DeviceSelector::Name("PCsensor FootSwitch".to_string())
        );
    }

    #[test]
    fn test_name_with_colon_is_not_an_id() {
        assert_eq!(
            DeviceSelector::parse(Some("Pedal: left")),
            DeviceSelector::Name("Pedal: left".to_string())
        );
        assert_eq!(
            DeviceSelector::parse(Some("zzzz:0001")),
            DeviceSelector::Name("zzzz:0001".to_string())
        );
    }

    #[test]
    fn test_selector_matches() {
        let pedal = info("/dev/input/event7", "Foot Switch", 0x05f3, 0x00ff, true);
        let mouse = info("/dev/input/event2", "Mouse", 0x046d, 0xc077, false);

        assert!(DeviceSelector::Name("Foot Switch".to_string()).matches(&pedal));
        assert!(!DeviceSelector::Name("Foot".to_string()).matches(&pedal));
        assert!(DeviceSelector::VendorProduct(0x05f3, 0x00ff).matches(&pedal));
        assert!(DeviceSelector::Path(PathBuf::from("/dev/input/event7")).matches(&pedal));
        assert!(DeviceSelector::FirstKeyboard.matches(&pedal));
        assert!(!DeviceSelector::FirstKeyboard.matches(&mouse));
    }
}
