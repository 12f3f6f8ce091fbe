use serde::{Deserialize, Serialize};
use std::fmt;

/// What the host should show around the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapStatus {
    Loading,
    /// Mounted with `visible` listings on the map
    Ready { visible: usize },
    /// Mounted, but no record survived validation
    Empty { message: String },
    /// Initialization gave up; `retry_available` drives the retry button
    Failed {
        message: String,
        retry_available: bool,
    },
}

impl MapStatus {
    pub fn empty() -> Self {
        Self::Empty {
            message: "No listings with a location to show".to_string(),
        }
    }

    pub fn failed(retry_available: bool) -> Self {
        Self::Failed {
            message: "Map failed to load".to_string(),
            retry_available,
        }
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self, Self::Ready { .. } | Self::Empty { .. })
    }
}

impl Default for MapStatus {
    fn default() -> Self {
        Self::Loading
    }
}

impl fmt::Display for MapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading map…"),
            Self::Ready { visible: 1 } => write!(f, "1 listing on the map"),
            Self::Ready { visible } => write!(f, "{} listings on the map", visible),
            Self::Empty { message } | Self::Failed { message, .. } => write!(f, "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_badge_text() {
        assert_eq!(MapStatus::Ready { visible: 1 }.to_string(), "1 listing on the map");
        assert_eq!(MapStatus::Ready { visible: 42 }.to_string(), "42 listings on the map");
        assert_eq!(MapStatus::failed(true).to_string(), "Map failed to load");
        assert!(MapStatus::empty().is_mounted());
        assert!(!MapStatus::default().is_mounted());
    }
}
