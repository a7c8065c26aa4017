//! Built-in device presets
//!
//! A fixed, read-only table mapping preset names to complete viewport
//! configurations, including the user-agent string sent while emulating the
//! device.

use serde::Serialize;

/// User agent sent by the `mobile` preset
pub const IPHONE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1";

/// User agent sent by the `tablet` preset
pub const IPAD_USER_AGENT: &str = "Mozilla/5.0 (iPad; CPU OS 14_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1";

/// User agent sent by the `desktop` preset
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// A named, fixed viewport configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePreset {
    /// Preset name used in requests
    pub name: &'static str,
    /// Device the preset emulates
    pub description: &'static str,
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Viewport height in CSS pixels
    pub height: u32,
    /// Device pixel ratio
    pub device_scale_factor: f64,
    /// Mobile emulation flag
    pub is_mobile: bool,
    /// Touch emulation flag
    pub has_touch: bool,
    /// User-agent override
    pub user_agent: &'static str,
}

/// All built-in presets, in display order
pub static DEVICE_PRESETS: [DevicePreset; 3] = [
    DevicePreset {
        name: "mobile",
        description: "iPhone SE / 8 class phone",
        width: 375,
        height: 667,
        device_scale_factor: 2.0,
        is_mobile: true,
        has_touch: true,
        user_agent: IPHONE_USER_AGENT,
    },
    DevicePreset {
        name: "tablet",
        description: "iPad class tablet, portrait",
        width: 768,
        height: 1024,
        device_scale_factor: 2.0,
        is_mobile: true,
        has_touch: true,
        user_agent: IPAD_USER_AGENT,
    },
    DevicePreset {
        name: "desktop",
        description: "1080p desktop browser",
        width: 1920,
        height: 1080,
        device_scale_factor: 1.0,
        is_mobile: false,
        has_touch: false,
        user_agent: DESKTOP_USER_AGENT,
    },
];

impl DevicePreset {
    /// Looks up a preset by exact name
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot_core::presets::DevicePreset;
    ///
    /// let mobile = DevicePreset::find("mobile").unwrap();
    /// assert_eq!((mobile.width, mobile.height), (375, 667));
    /// assert!(DevicePreset::find("watch").is_none());
    /// ```
    pub fn find(name: &str) -> Option<&'static DevicePreset> {
        DEVICE_PRESETS.iter().find(|preset| preset.name == name)
    }

    /// All presets, in display order
    pub fn all() -> &'static [DevicePreset] {
        &DEVICE_PRESETS
    }

    /// Names of all presets
    pub fn names() -> Vec<&'static str> {
        DEVICE_PRESETS.iter().map(|preset| preset.name).collect()
    }
}

/// Renders the preset table as human-readable text
pub fn format_presets() -> String {
    let mut out = String::from("Available device presets:\n");
    for preset in DevicePreset::all() {
        out.push_str(&format!(
            "\n- {} ({}): {}x{} @{}x, mobile: {}, touch: {}\n  User agent: {}\n",
            preset.name,
            preset.description,
            preset.width,
            preset.height,
            preset.device_scale_factor,
            preset.is_mobile,
            preset.has_touch,
            preset.user_agent,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ViewportConfig, ViewportParams};

    #[test]
    fn test_mobile_preset_fields() {
        let viewport = ViewportParams::preset("mobile").resolve();

        assert_eq!(viewport.width, 375);
        assert_eq!(viewport.height, 667);
        assert_eq!(viewport.device_scale_factor, 2.0);
        assert!(viewport.is_mobile);
        assert!(viewport.has_touch);
        assert_eq!(viewport.user_agent.as_deref(), Some(IPHONE_USER_AGENT));
    }

    #[test]
    fn test_desktop_preset_is_not_mobile() {
        let desktop = DevicePreset::find("desktop").unwrap();
        let viewport = ViewportConfig::from(desktop);

        assert!(!viewport.is_mobile);
        assert!(!viewport.has_touch);
        assert_eq!(viewport.user_agent.as_deref(), Some(DESKTOP_USER_AGENT));
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(DevicePreset::names(), vec!["mobile", "tablet", "desktop"]);
    }

    #[test]
    fn test_preset_lookup_is_exact() {
        assert!(DevicePreset::find("Mobile").is_none());
        assert!(DevicePreset::find(" mobile").is_none());
    }

    #[test]
    fn test_presets_are_within_viewport_bounds() {
        for preset in DevicePreset::all() {
            let viewport = ViewportConfig::from(preset);
            crate::validation::validate_viewport_config(&viewport)
                .unwrap_or_else(|e| panic!("preset {} is invalid: {}", preset.name, e));
        }
    }

    #[test]
    fn test_format_presets_lists_every_preset() {
        let text = format_presets();

        for preset in DevicePreset::all() {
            assert!(text.contains(preset.name));
            assert!(text.contains(preset.user_agent));
        }
        assert!(text.contains("375x667"));
    }
}
