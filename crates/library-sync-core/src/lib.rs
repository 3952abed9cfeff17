pub mod binge;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod guard;
pub mod import;
pub mod job;
pub mod preview;
pub mod rating;
pub mod store;
pub mod sync;

pub use binge::{apply_air_date_correction, binge_days, AirDateIndex, BINGE_DAY_EPISODE_THRESHOLD};
pub use dedup::{dedupe_by_source_id, HasSourceId};
pub use engine::SyncEngine;
pub use error::SyncError;
pub use guard::ExistenceGuard;
pub use job::ImportJobController;
pub use rating::map_source_rating;
pub use store::{JsonLibraryStore, LibraryStats, LibraryStore, StoreError};

#[cfg(test)]
pub(crate) mod testutil;
