//! GEDCOM 5.5 (lineage-linked, UTF-8) output and a structural checker for it.

pub mod emit;
pub mod validate;

pub use emit::emit;
pub use validate::{validate_file, Report};

pub const SUBMITTER_ID: &str = "@B00000@";
pub const REPOSITORY_ID: &str = "@R00000@";
