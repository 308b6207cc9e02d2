//! Report summaries rendered with Tera
//!
//! The summary template is parsed once, when the configuration is loaded, so a
//! broken template is a configuration error instead of a per-package failure.
//! Rendering only sees the fields a [`PackageRecord`] puts into the context:
//!
//! | Field | Value |
//! | --- | --- |
//! | `name` | package name |
//! | `regex` | resolved extraction pattern |
//! | `url` | resolved location |
//! | `repo_name` | repository the packaged version comes from |
//! | `versions` | every upstream version found (list) |
//! | `latest_upstream` | newest upstream version |
//! | `repo_version` | packaged version |
//!
//! The last three are only present once the record has computed them.
//!
//! [`PackageRecord`]: crate::upstream::record::PackageRecord

use tera::{Context, Tera};

use crate::config::DEFAULT_SUMMARY_TEMPLATE;
use crate::upstream::error::SummaryError;

const TEMPLATE_NAME: &str = "summary";

/// Parsed summary template
#[derive(Clone)]
pub struct SummaryTemplate {
    source: String,
    tera: Tera,
}

impl SummaryTemplate {
    pub fn new(source: &str) -> Result<Self, SummaryError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| SummaryError::Invalid(error_message(&e)))?;

        Ok(Self {
            source: source.to_string(),
            tera,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, context: &Context) -> Result<String, SummaryError> {
        self.tera
            .render(TEMPLATE_NAME, context)
            .map_err(|e| SummaryError::Render(error_message(&e)))
    }
}

impl Default for SummaryTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_TEMPLATE).expect("valid default summary template")
    }
}

impl std::fmt::Debug for SummaryTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SummaryTemplate").field(&self.source).finish()
    }
}

/// Tera keeps the useful part of a message in the source chain
fn error_message(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
