//! Business logic services

pub mod comments;
pub mod directory;
pub mod station_sync;

pub use comments::{CommentError, CommentStore};
pub use directory::{DirectoryConfig, DirectoryRoute, RadioBrowserClient, StationDirectory, UpstreamError};
pub use station_sync::StationSynchronizer;
