//! A multi-threaded directory scanner that classifies entries against glob
//! rules and surfaces the biggest temp/cache/build-artifact offenders on
//! disk.
//!
//! The crate is organized around the data flow: [`scan::scan`] walks a
//! directory tree into a [`tree::ScanNode`] tree plus [`scan::ScanStats`];
//! [`insight::generate_insights`] then walks that tree against an
//! [`config::AppConfig`]'s pattern rules to produce ranked
//! [`insight::InsightBundle`]s.

pub mod config;
pub mod error;
pub mod fs;
pub mod insight;
pub mod pattern;
pub mod queue;
pub mod scan;
pub mod tree;
