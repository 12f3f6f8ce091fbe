pub mod capability;
pub mod events;
pub mod interaction;

// Re-export the essential types
pub use capability::{DeviceHints, InputCapability};
pub use events::{EventCallback, EventManager, MapEvent};
pub use interaction::{
    InteractionEffect, InteractionModeController, InteractionState, Placement, PreviewState,
    SelectionOrigin,
};
