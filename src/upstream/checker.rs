//! Sequential evaluation of many package records
//!
//! One package's failure never aborts the batch: every record ends up as one
//! [`CheckOutcome`], and failures are logged with a severity that depends on
//! whether the caller should care (untracked packages are only noted, retrieval
//! failures are errors).

use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, info, warn};

use crate::upstream::error::{CheckError, ReportError};
use crate::upstream::record::PackageRecord;
use crate::upstream::summary::SummaryTemplate;
use crate::upstream::types::{Comparison, PackagedVersion};

/// Receiver of outdated packages, e.g. a ticket tracker
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Report that `name` is outdated
    ///
    /// # Returns
    /// * `Ok(Some(url))` - Where the report can be found
    /// * `Ok(None)` - Nothing was filed (e.g. dry run or already reported)
    async fn report_outdated(
        &self,
        name: &str,
        latest_upstream: &str,
        summary: &str,
    ) -> Result<Option<String>, ReportError>;
}

/// Sink that only logs what would be reported
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait::async_trait]
impl ReportSink for LogSink {
    async fn report_outdated(
        &self,
        name: &str,
        latest_upstream: &str,
        summary: &str,
    ) -> Result<Option<String>, ReportError> {
        info!("Would report '{}' ({}): {}", name, latest_upstream, summary);
        Ok(None)
    }
}

/// Options of a batch run
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Skip packages whose name sorts before this one
    pub start_with: String,
    /// Packages that are checked but never reported
    pub ignored: HashSet<String>,
    /// Owners whose packages are checked but never reported
    pub ignored_owners: HashSet<String>,
    /// Summary handed to the sink, rendered against the record
    pub summary_template: SummaryTemplate,
}

impl CheckOptions {
    fn is_ignored(&self, record: &PackageRecord) -> bool {
        self.ignored.contains(record.name())
            || record
                .owner()
                .is_some_and(|owner| self.ignored_owners.contains(&owner))
    }
}

/// Result of checking one package
#[derive(Debug)]
pub enum CheckOutcome {
    /// Upstream is newer than the packaged version
    Outdated {
        name: String,
        packaged: PackagedVersion,
        latest_upstream: String,
        /// Where the report was filed, if the sink filed one
        report: Option<String>,
    },
    /// Packaged version matches upstream
    Current { name: String },
    /// The distribution ships something newer than the upstream listing
    PackagedNewer {
        name: String,
        packaged: PackagedVersion,
        latest_upstream: String,
    },
    /// Not checked because of `start_with`
    Skipped { name: String },
    Failed { name: String, error: CheckError },
}

impl CheckOutcome {
    pub fn name(&self) -> &str {
        match self {
            CheckOutcome::Outdated { name, .. }
            | CheckOutcome::Current { name }
            | CheckOutcome::PackagedNewer { name, .. }
            | CheckOutcome::Skipped { name }
            | CheckOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_outdated(&self) -> bool {
        matches!(self, CheckOutcome::Outdated { .. })
    }
}

/// Check every record in order and report the outdated ones to `sink`
pub async fn check_all(
    records: &mut [PackageRecord],
    options: &CheckOptions,
    sink: &dyn ReportSink,
) -> Vec<CheckOutcome> {
    let total = records.len();
    info!("Checking {} packages", total);

    let mut outcomes = Vec::with_capacity(total);
    for (number, record) in records.iter_mut().enumerate() {
        let name = record.name().to_string();

        if name.as_str() < options.start_with.as_str() {
            info!("skipping package '{}'", name);
            outcomes.push(CheckOutcome::Skipped { name });
            continue;
        }

        info!("checking package '{}' ({}/{})", name, number + 1, total);
        let outcome = match check_one(record, options, sink).await {
            Ok(outcome) => outcome,
            Err(error) => {
                log_failure(&error);
                CheckOutcome::Failed { name, error }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}

async fn check_one(
    record: &mut PackageRecord,
    options: &CheckOptions,
    sink: &dyn ReportSink,
) -> Result<CheckOutcome, CheckError> {
    let name = record.name().to_string();
    let comparison = record.comparison().await?;
    let packaged = record.packaged_version()?.clone();
    let latest_upstream = record.latest_upstream().await?.to_string();

    let outcome = match comparison {
        Comparison::Equal => CheckOutcome::Current { name },
        Comparison::PackagedNewer => {
            debug!(
                "'{}' is newer in {} ({} > {})",
                name,
                record.repo_name(),
                packaged,
                latest_upstream
            );
            CheckOutcome::PackagedNewer {
                name,
                packaged,
                latest_upstream,
            }
        }
        Comparison::UpstreamNewer => {
            info!(
                "package '{}' outdated ({} < {})",
                name, packaged.version, latest_upstream
            );

            let report = if options.is_ignored(record) {
                info!("Nagging disabled for package: {}", name);
                None
            } else {
                match record.render(&options.summary_template) {
                    Ok(summary) => {
                        match sink.report_outdated(&name, &latest_upstream, &summary).await {
                            Ok(report) => report,
                            Err(e) => {
                                error!("{}", e);
                                None
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Not reporting outdated package: {}", e);
                        None
                    }
                }
            };

            CheckOutcome::Outdated {
                name,
                packaged,
                latest_upstream,
                report,
            }
        }
    };

    Ok(outcome)
}

fn log_failure(error: &CheckError) {
    match error {
        CheckError::PackagedVersionNotFound { .. } => debug!("{}", error),
        CheckError::RetrievalFailed { .. } => error!("{}", error),
        _ => warn!("{}", error),
    }
}
