//! Incremental, versioned packaging of a directory tree.
//!
//! A [`scanner::Scanner`] fingerprints the filtered tree into a
//! [`snapshot::Snapshot`], [`snapshot::diff`] compares it with the last
//! committed snapshot held by the [`ledger::VersionLedger`], the
//! [`archive`] module zips the selected files, and the
//! [`cache::ContentCache`] keeps their bytes for later comparison.
//! [`packer::Packer`] wires the pieces together.

/// Application directory helpers.
pub mod app_dirs;
/// Zip package building and inspection.
pub mod archive;
/// Last packaged content per path.
pub mod cache;
/// Cooperative cancellation token.
pub mod cancel;
/// TOML configuration.
pub mod config;
/// Path inclusion rules.
pub mod filter;
/// Version history and the last committed snapshot.
pub mod ledger;
/// Tracing setup.
pub mod logging;
/// Scan-diff-build-commit orchestration.
pub mod packer;
/// Directory scanning and content hashing.
pub mod scanner;
/// File fingerprints and change classification.
pub mod snapshot;
/// Keyed record persistence.
pub mod store;
