pub mod clustering;
pub mod index;

pub use clustering::{cluster_click_target, CellKey, ClusterCell, ClusterOutput, RenderItem, SpatialClusterer};
pub use index::RecordIndex;
