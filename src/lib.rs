//! mediacat: a local batch pipeline that ingests a media tree and maintains
//! a searchable SQLite catalog of per-asset metadata and keyword tags.

pub mod analyzer;
pub mod config;
pub mod db;
pub mod error;
pub mod keyframes;
pub mod logging;
pub mod pipeline;
pub mod probe;
pub mod scanner;
pub mod sidecar;
