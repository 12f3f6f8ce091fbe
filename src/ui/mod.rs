pub mod popup;
pub mod status;

pub use popup::{format_price, PopupContent};
pub use status::MapStatus;
