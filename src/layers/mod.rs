pub mod marker;

pub use marker::{MarkerKey, MarkerKind, MarkerLifecycleManager, MarkerSpec, ReconcileReport};
