//! One function per subcommand. Each builds what it needs from
//! [`config::GlobalOptions`], talks to the feed and prints the result.

pub mod config;
mod delete;
mod pack;
mod push;
mod search;
pub mod settings;
mod versions;

pub use delete::delete;
pub use pack::pack;
pub use push::push;
pub use search::search;
pub use versions::versions;

pub use config::{Config, GlobalOptions};
