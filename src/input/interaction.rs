//! Per-device interaction state machine.
//!
//! The controller never touches the surface itself; every transition returns
//! the [`InteractionEffect`]s the caller must apply, in order.

use crate::core::config::InteractionConfig;
use crate::core::geo::Point;
use crate::input::capability::InputCapability;
use serde::{Deserialize, Serialize};

/// Which half of the map the touch preview panel covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewState {
    pub active_record_id: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionState {
    #[default]
    Idle,
    PointerHover { record_id: String },
    PointerSelected { record_id: String },
    TouchSelected(PreviewState),
    TouchExpanded(PreviewState),
}

impl InteractionState {
    pub fn selected_record_id(&self) -> Option<&str> {
        match self {
            Self::PointerSelected { record_id } => Some(record_id),
            Self::TouchSelected(preview) | Self::TouchExpanded(preview) => {
                Some(&preview.active_record_id)
            }
            Self::Idle | Self::PointerHover { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InteractionEffect {
    OpenPopup { record_id: String },
    ClosePopup,
    ShowTooltip { record_id: String },
    HideTooltip { record_id: String },
    ShowPreview(PreviewState),
    ExpandPreview(PreviewState),
    HidePreview,
    /// Pan the view by this many pixels
    PanBy(Point),
    /// Tell the host about the new selection
    NotifySelection(Option<String>),
}

/// Who asked for a selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    /// Marker click or dismissal on the map
    User,
    /// The host pushed a selected record; not echoed back
    Controlled,
}

#[derive(Debug, Clone)]
pub struct InteractionModeController {
    capability: InputCapability,
    pan_offset: f64,
    hover_tooltips: bool,
    state: InteractionState,
}

impl InteractionModeController {
    pub fn new(capability: InputCapability, config: &InteractionConfig) -> Self {
        Self {
            capability,
            pan_offset: config.preview_pan_offset_px,
            hover_tooltips: config.hover_tooltips,
            state: InteractionState::Idle,
        }
    }

    pub fn capability(&self) -> InputCapability {
        self.capability
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Present only while a touch selection is active
    pub fn preview(&self) -> Option<&PreviewState> {
        match &self.state {
            InteractionState::TouchSelected(preview) | InteractionState::TouchExpanded(preview) => {
                Some(preview)
            }
            _ => None,
        }
    }

    pub fn selected_record_id(&self) -> Option<&str> {
        self.state.selected_record_id()
    }

    /// Whether markers should report hover at all
    pub fn wants_hover(&self) -> bool {
        self.hover_tooltips && self.capability.supports_hover()
    }

    /// Selects `record_id`, whose marker sits at `marker_px` inside a
    /// container of `container` pixels.
    pub fn select(
        &mut self,
        record_id: &str,
        marker_px: Point,
        container: Point,
        origin: SelectionOrigin,
    ) -> Vec<InteractionEffect> {
        if self.selected_record_id() == Some(record_id) {
            return Vec::new();
        }

        let mut effects = self.clear_current();
        match self.capability {
            InputCapability::Pointer => {
                self.state = InteractionState::PointerSelected {
                    record_id: record_id.to_string(),
                };
                effects.push(InteractionEffect::OpenPopup {
                    record_id: record_id.to_string(),
                });
            }
            InputCapability::Touch => {
                // Panel goes on the half the marker is not in
                let (placement, dy) = if marker_px.y < container.y / 2.0 {
                    (Placement::Bottom, self.pan_offset)
                } else {
                    (Placement::Top, -self.pan_offset)
                };
                let preview = PreviewState {
                    active_record_id: record_id.to_string(),
                    placement,
                };
                effects.push(InteractionEffect::ShowPreview(preview.clone()));
                effects.push(InteractionEffect::PanBy(Point::new(0.0, dy)));
                self.state = InteractionState::TouchSelected(preview);
            }
        }

        if origin == SelectionOrigin::User {
            effects.push(InteractionEffect::NotifySelection(Some(record_id.to_string())));
        }
        effects
    }

    pub fn hover_start(&mut self, record_id: &str) -> Vec<InteractionEffect> {
        if !self.wants_hover() {
            return Vec::new();
        }
        if self.state == InteractionState::Idle {
            self.state = InteractionState::PointerHover {
                record_id: record_id.to_string(),
            };
        }
        vec![InteractionEffect::ShowTooltip {
            record_id: record_id.to_string(),
        }]
    }

    pub fn hover_end(&mut self, record_id: &str) -> Vec<InteractionEffect> {
        if !self.wants_hover() {
            return Vec::new();
        }
        if matches!(&self.state, InteractionState::PointerHover { record_id: id } if id == record_id)
        {
            self.state = InteractionState::Idle;
        }
        vec![InteractionEffect::HideTooltip {
            record_id: record_id.to_string(),
        }]
    }

    /// Expands the touch preview; ignored in any other state
    pub fn view_details(&mut self) -> Vec<InteractionEffect> {
        match &self.state {
            InteractionState::TouchSelected(preview) => {
                let preview = preview.clone();
                self.state = InteractionState::TouchExpanded(preview.clone());
                vec![InteractionEffect::ExpandPreview(preview)]
            }
            _ => Vec::new(),
        }
    }

    /// Close button, backdrop tap or a cleared controlled selection
    pub fn dismiss(&mut self, origin: SelectionOrigin) -> Vec<InteractionEffect> {
        let had_selection = self.selected_record_id().is_some();
        let mut effects = self.clear_current();
        if had_selection && origin == SelectionOrigin::User {
            effects.push(InteractionEffect::NotifySelection(None));
        }
        effects
    }

    /// Back to idle, returning what has to be taken down
    fn clear_current(&mut self) -> Vec<InteractionEffect> {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => Vec::new(),
            InteractionState::PointerHover { record_id } => {
                vec![InteractionEffect::HideTooltip { record_id }]
            }
            InteractionState::PointerSelected { .. } => vec![InteractionEffect::ClosePopup],
            InteractionState::TouchSelected(_) | InteractionState::TouchExpanded(_) => {
                vec![InteractionEffect::HidePreview]
            }
        }
    }
}
