//! Adapters named in `spec.md` §6 but placed out of scope as "external
//! collaborators". This crate still defines the data types those adapters
//! must produce, and ships a thin, real implementation of each so the crate
//! runs end-to-end (`SPEC_FULL.md` §C).

pub mod event_file;
pub mod output;
pub mod types;
pub mod wind_file;
