//! Upstream version discovery and comparison
//!
//! This module turns a roster entry `(name, pattern, location)` into a verdict on
//! whether the packaged version has fallen behind the upstream release.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Alias    │────▶│   Record    │◀────│   Checker   │
//! │  (resolve)  │     │  (caches)   │     │   (batch)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                       │    │     │
//!          ┌────────────┘    │     └────────────┐
//!          ▼                 ▼                  ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │     │  Extractor  │     │   Vercmp    │
//! │   (fetch)   │     │   (regex)   │     │ (rpm order) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`alias`]: Alias table and resolution of symbolic patterns and locations
//! - [`template`]: `{field}` substitution in alias templates
//! - [`summary`]: Tera-rendered report summaries over a whitelisted context
//! - [`extractor`]: Applies an extraction pattern to fetched listing content
//! - [`vercmp`]: Distribution-style version ordering and the upstream/packaged verdict
//! - [`fetcher`]: Fetcher trait, HTTP implementation and wildcard directory expansion
//! - [`packaged`]: Packaged-version provider trait and repository index
//! - [`record`]: Package record binding the pieces together with lazy caches
//! - [`checker`]: Sequential batch evaluation with per-package failure isolation
//! - [`error`]: Error types for every layer
//! - [`types`]: Shared value types like `VersionSet` and `Comparison`

pub mod alias;
pub mod checker;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod packaged;
pub mod record;
pub mod summary;
pub mod template;
pub mod types;
pub mod vercmp;
