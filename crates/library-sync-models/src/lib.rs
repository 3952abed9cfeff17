pub mod history;
pub mod import;
pub mod library;
pub mod media;
pub mod metadata;
pub mod preview;
pub mod sync;

pub use history::{EpisodeWatch, HistoryItem, WatchedSeriesRecord};
pub use import::{ImportJobState, ImportOptions};
pub use library::{EpisodeRecord, LocalId, MovieEntry, NewMovie, NewSeries, SeriesEntry, WatchSession};
pub use media::MediaKind;
pub use metadata::{EpisodeDetails, MovieDetails, SeasonDetails, SeriesDetails};
pub use preview::{ImportPreview, PreviewEntry};
pub use sync::{SyncReport, SyncStatus};
