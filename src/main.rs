use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use upstream_check::config::{self, CheckConfig};
use upstream_check::roster::Roster;
use upstream_check::upstream::alias::AliasKind;
use upstream_check::upstream::checker::{CheckOptions, CheckOutcome, LogSink, check_all};
use upstream_check::upstream::fetcher::{Fetcher, HttpFetcher};
use upstream_check::upstream::packaged::RepoIndex;
use upstream_check::upstream::record::PackageContext;

#[derive(Parser)]
#[command(name = "upstream-check")]
#[command(version, about = "Compare packaged versions against upstream releases")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check every package listed in a roster
    Check {
        /// Roster page, as a local path or an http(s) URL
        #[arg(long)]
        roster: String,

        /// Tab-separated `name version release` index of the repository
        #[arg(long)]
        index: PathBuf,

        #[arg(long, default_value = "rawhide")]
        repo_name: String,

        /// Skip packages whose name sorts before this one
        #[arg(long, default_value = "")]
        start_with: String,

        /// Package that is checked but never reported (repeatable)
        #[arg(long = "ignore")]
        ignored: Vec<String>,

        /// Also write JSON logs to this file (the data directory log when no path is given)
        #[arg(long)]
        log_file: Option<Option<PathBuf>>,
    },
    /// Resolve an alias for a package name
    Resolve {
        #[arg(long)]
        name: String,

        #[arg(long)]
        value: String,

        /// `regex` or `url`
        #[arg(long, default_value = "url")]
        kind: String,
    },
    /// Print the effective alias table as JSON
    DumpAliases,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Command::Check {
            log_file: Some(path),
            ..
        } => Some(path.clone().unwrap_or_else(config::log_path)),
        _ => None,
    };
    let _guard = upstream_check::logging::init(&cli.log_level, log_file.as_deref())
        .context("Failed to initialize logging")?;

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let config = CheckConfig::load(&config_path)?;

    match cli.command {
        Command::Check {
            roster,
            index,
            repo_name,
            start_with,
            ignored,
            ..
        } => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run_check(
                config,
                roster,
                index,
                repo_name,
                CheckOptions {
                    start_with,
                    ignored: ignored.into_iter().collect(),
                    ..CheckOptions::default()
                },
            )),
        Command::Resolve { name, value, kind } => {
            let kind: AliasKind = kind
                .parse()
                .map_err(|_| anyhow!("Unknown alias kind '{}', expected regex or url", kind))?;
            println!("{}", config.alias_table()?.resolve(&name, &value, kind)?);
            Ok(())
        }
        Command::DumpAliases => {
            let table = config.alias_table()?;
            println!("{}", serde_json::to_string_pretty(table.rules())?);
            Ok(())
        }
    }
}

async fn run_check(
    config: CheckConfig,
    roster: String,
    index: PathBuf,
    repo_name: String,
    options: CheckOptions,
) -> anyhow::Result<()> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        config.fetch.timeout(),
        &config.fetch.user_agent,
    ));
    let index = RepoIndex::from_file(&repo_name, &index)
        .with_context(|| format!("Failed to read repository index {:?}", index))?;
    info!("Loaded {} packages from {}", index.len(), repo_name);

    let page = if roster.starts_with("http://") || roster.starts_with("https://") {
        fetcher.fetch(&roster).await?
    } else {
        std::fs::read_to_string(&roster)
            .with_context(|| format!("Failed to read roster {}", roster))?
    };
    let roster = Roster::parse(&page);

    let context = PackageContext::new(Arc::new(config.alias_table()?), fetcher, Arc::new(index));
    let (mut records, errors) = roster.records(&context);
    for e in &errors {
        error!("{}", e);
    }

    let options = CheckOptions {
        ignored_owners: roster.ignore_owners.iter().cloned().collect(),
        summary_template: config.summary_template()?,
        ..options
    };
    let outcomes = check_all(&mut records, &options, &LogSink).await;

    for outcome in &outcomes {
        if let CheckOutcome::Outdated {
            name,
            packaged,
            latest_upstream,
            ..
        } = outcome
        {
            println!("{}\t{}\t{}", name, packaged, latest_upstream);
        }
    }

    let failed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, CheckOutcome::Failed { .. }))
        .count();
    info!(
        "Checked {} packages: {} outdated, {} failed",
        outcomes.len(),
        outcomes.iter().filter(|outcome| outcome.is_outdated()).count(),
        failed + errors.len()
    );

    Ok(())
}
