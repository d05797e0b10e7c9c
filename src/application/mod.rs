//! Application layer: state and policy the feed core leaves to its caller.
//!
//! The core is stateless; this layer keeps the resolved endpoints for the
//! current feed, persists settings, tracks which versions the user picked and
//! decides when a read is worth retrying.

mod confirm;
mod retry;
mod selection;
mod session;
mod settings;

pub use confirm::{confirm, confirm_with_io};
pub use retry::{RetryPolicy, Transient, with_retry};
pub use selection::Selection;
pub use session::FeedSession;
pub use settings::Settings;
