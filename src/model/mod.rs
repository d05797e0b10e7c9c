//! Normalized package/version model shared by every feed operation.

mod package;
mod version;

pub use package::{Package, PackageVersion, RemovalOutcome};
pub(crate) use package::sort_newest_first;
pub use version::{FeedVersion, VersionParseError};
