//! CLI command implementations

pub mod add;
pub mod completions;
pub mod import;
pub mod init;
pub mod list;
pub mod migrate;
pub mod show;
pub mod stats;
pub mod verify;
