pub mod corpus;
pub mod snapshot;

pub use corpus::{load_items_json, MovieLensLoader};
pub use snapshot::{SnapshotDescription, SnapshotManager};
