//! CLI command implementations.

pub mod delete_version;
pub mod dump_log;
pub mod inspect;
pub mod restore;
pub mod snapshot;
pub mod version_info;
pub mod versions;
