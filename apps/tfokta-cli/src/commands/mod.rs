//! CLI command implementations

pub mod delete;
pub mod doctor;
pub mod import;
pub mod kinds;
