pub mod application;
pub mod archive;
pub mod commands;
pub mod error;
pub mod feed;
pub mod http;
pub mod model;
pub mod toolchain;
