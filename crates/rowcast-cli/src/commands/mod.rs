//! CLI command implementations

pub mod init;
pub mod project;
pub mod tables;
pub mod validate;
