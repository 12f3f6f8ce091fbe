pub mod record;
pub mod validate;

pub use record::{GeoRecord, RawAddress, RawCoordinate, RawCoordinates, RawDetails, RawProperty};
pub use validate::{Diagnostic, DropReason, GeoRecordValidator, ValidationOutcome};
