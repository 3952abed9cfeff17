pub mod api;
pub mod auth;
pub mod client;
pub mod metadata;

pub use auth::authenticate as trakt_authenticate;
pub use client::TraktClient;
pub use metadata::TraktMetadataClient;
