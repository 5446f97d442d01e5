//! CLI command implementations.

pub mod common;
pub mod info;
pub mod result;
pub mod run;
pub mod status;
pub mod submit;
pub mod version;
