use serde::{Deserialize, Serialize};

/// Raw device facts the host reports once at mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHints {
    pub max_touch_points: u32,
    /// `(pointer: coarse)` matches
    pub coarse_pointer: bool,
    /// `(hover: hover)` matches
    pub hover_capable: bool,
}

impl DeviceHints {
    pub fn pointer() -> Self {
        Self {
            max_touch_points: 0,
            coarse_pointer: false,
            hover_capable: true,
        }
    }

    pub fn touch() -> Self {
        Self {
            max_touch_points: 5,
            coarse_pointer: true,
            hover_capable: false,
        }
    }

    /// Reads the hints from the current browser window
    #[cfg(feature = "wasm")]
    pub fn from_browser() -> Option<Self> {
        let window = web_sys::window()?;
        let matches = |query: &str| {
            window
                .match_media(query)
                .ok()
                .flatten()
                .map(|list| list.matches())
                .unwrap_or(false)
        };
        Some(Self {
            max_touch_points: window.navigator().max_touch_points().max(0) as u32,
            coarse_pointer: matches("(pointer: coarse)"),
            hover_capable: matches("(hover: hover)"),
        })
    }
}

impl Default for DeviceHints {
    fn default() -> Self {
        Self::pointer()
    }
}

/// Interaction mode, decided once per mounted session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputCapability {
    Pointer,
    Touch,
}

impl InputCapability {
    /// A touch screen that also hovers (touch laptops) stays in pointer mode.
    pub fn detect(hints: &DeviceHints) -> Self {
        if hints.coarse_pointer || (hints.max_touch_points > 0 && !hints.hover_capable) {
            Self::Touch
        } else {
            Self::Pointer
        }
    }

    pub fn is_touch(self) -> bool {
        self == Self::Touch
    }

    pub fn supports_hover(self) -> bool {
        self == Self::Pointer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(InputCapability::detect(&DeviceHints::pointer()), InputCapability::Pointer);
        assert_eq!(InputCapability::detect(&DeviceHints::touch()), InputCapability::Touch);

        let touch_laptop = DeviceHints {
            max_touch_points: 10,
            coarse_pointer: false,
            hover_capable: true,
        };
        assert_eq!(InputCapability::detect(&touch_laptop), InputCapability::Pointer);

        let tablet_without_media_queries = DeviceHints {
            max_touch_points: 5,
            coarse_pointer: false,
            hover_capable: false,
        };
        assert!(InputCapability::detect(&tablet_without_media_queries).is_touch());
    }
}
