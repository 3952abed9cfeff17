pub mod error;
pub mod traits;
pub mod trakt;

pub use error::SourceError;
pub use traits::{MetadataClient, SourceClient};
pub use trakt::{TraktClient, TraktMetadataClient};
