//! CLI command implementations

pub mod build;
pub mod completions;
pub mod describe;
pub mod init;
pub mod lint;
pub mod list;
pub mod new;
pub mod schema;
