//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, RecordsAction, StateAction};
use crate::config::WatchConfig;
use crate::decode::build_decoder;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::notify::{notifier_from_config, test_message, CiOutput};
use crate::probe::{HttpProber, ProbeResult};
use crate::records::RecordStore;
use crate::scan::{ScanOutcome, Scanner};
use crate::state::StateManager;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

/// Process exit status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanExit {
    /// Finished without new records (or a non-scan command succeeded)
    NoNews,
    /// New records were found
    NewsFound,
    /// Configuration or other fatal error
    Fatal,
    /// The state file could not be written
    StateWriteFailed,
}

impl ScanExit {
    /// Numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::NoNews => 0,
            Self::NewsFound => 77,
            Self::Fatal => 1,
            Self::StateWriteFailed => 2,
        }
    }

    /// Exit status for an error that ended the run
    pub fn from_error(error: &Error) -> Self {
        if error.is_state_error() {
            Self::StateWriteFailed
        } else {
            Self::Fatal
        }
    }
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<ScanExit> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::Scan { dry_run, .. } => self.scan(&config, *dry_run).await,
            Commands::Probe { id } => self.probe(&config, *id).await,
            Commands::State { action } => self.state(&config, action).await,
            Commands::Records { action } => self.records(&config, action),
            Commands::TestNotify => self.test_notify(&config).await,
            Commands::Validate => {
                let mut shown = config.clone();
                if shown.notify.telegram.bot_token.is_some() {
                    shown.notify.telegram.bot_token = Some("<redacted>".to_string());
                }
                self.output_message(&serde_json::to_value(&shown)?);
                Ok(ScanExit::NoNews)
            }
        }
    }

    /// Load config from file and environment, then apply CLI flags
    fn load_config(&self) -> Result<WatchConfig> {
        let mut config = WatchConfig::load(self.cli.config.as_deref())?;

        if let Some(path) = &self.cli.state {
            config.state.path.clone_from(path);
        }

        if let Commands::Scan {
            max_probes,
            blank_run_limit,
            github_output,
            ..
        } = &self.cli.command
        {
            if let Some(max) = max_probes {
                config.scan.max_probes = *max;
            }
            if let Some(limit) = blank_run_limit {
                config.scan.blank_run_limit = Some(*limit);
            }
            if let Some(path) = github_output {
                config.notify.github_output = Some(path.clone());
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn build_prober(config: &WatchConfig) -> Result<HttpProber> {
        let client = HttpClient::with_config(config.http_client_config())?;
        let decoder = build_decoder(config.source.decoder)?;
        Ok(HttpProber::new(config.url_template()?, client, decoder)
            .with_end_markers(config.source.end_of_data_markers.clone()))
    }

    fn open_records(config: &WatchConfig) -> Result<Option<RecordStore>> {
        config
            .records
            .database
            .as_ref()
            .map(RecordStore::open)
            .transpose()
    }

    /// Run one incremental scan
    async fn scan(&self, config: &WatchConfig, dry_run: bool) -> Result<ScanExit> {
        let scan_name = config.scan.name.as_str();
        let state = StateManager::open(&config.state.path, scan_name);

        let cursor = match &self.cli.command {
            Commands::Scan {
                start_id: Some(start),
                ..
            } => *start,
            _ => state.load_cursor(scan_name, config.scan.seed_id).await,
        };
        let known = state.known_names(scan_name).await;

        let prober = Self::build_prober(config)?;
        let scanner = Scanner::new(config.scan_config());
        let outcome = scanner.scan(cursor, &prober, &known).await;

        if dry_run {
            info!("Dry run: state, records and notifications skipped");
        } else {
            state
                .record(scan_name, outcome.cursor, &outcome.new_names)
                .await;
            state.save().await?;
            self.deliver(config, &outcome).await;
        }

        self.output_message(&json!({
            "type": "SCAN",
            "scan": scan_name,
            "dry_run": dry_run,
            "outcome": outcome,
        }));

        Ok(if outcome.has_news() {
            ScanExit::NewsFound
        } else {
            ScanExit::NoNews
        })
    }

    /// Store, notify and publish a scan outcome; failures are logged only
    async fn deliver(&self, config: &WatchConfig, outcome: &ScanOutcome) {
        if !outcome.has_news() {
            return;
        }

        let store = match Self::open_records(config) {
            Ok(store) => store,
            Err(e) => {
                error!("Record store unavailable: {e}");
                None
            }
        };
        if let Some(store) = &store {
            match store.insert_new(&outcome.found) {
                Ok(inserted) => info!("Stored {} new records", inserted.len()),
                Err(e) => error!("Failed to store records: {e}"),
            }
        }

        match notifier_from_config(&config.notify.telegram) {
            Ok(notifier) => match notifier.notify(&outcome.found).await {
                Ok(()) => {
                    if let Some(store) = &store {
                        let ids: Vec<u64> = outcome.found.iter().map(|r| r.id).collect();
                        if let Err(e) = store.mark_notified(&ids) {
                            error!("Failed to mark records notified: {e}");
                        }
                    }
                }
                Err(e) => error!("Notification failed: {e}"),
            },
            Err(e) => error!("Cannot create notifier: {e}"),
        }

        if let Some(path) = &config.notify.github_output {
            if let Err(e) = CiOutput::new(path).write(&outcome.found) {
                error!("Failed to write CI output: {e}");
            }
        }
    }

    /// Probe one identifier and print its classification
    async fn probe(&self, config: &WatchConfig, id: u64) -> Result<ScanExit> {
        let prober = Self::build_prober(config)?;
        let url = prober.template().url_for(id)?;
        let result = prober.try_probe(id).await?;
        let accepted = match &result {
            ProbeResult::Match(record) => config.scan_config().accepts(record),
            ProbeResult::NoMatch | ProbeResult::EndOfData => false,
        };

        self.output_message(&json!({
            "type": "PROBE",
            "id": id,
            "template": prober.template().as_str(),
            "url": url,
            "accepted": accepted,
            "classification": result,
        }));
        Ok(ScanExit::NoNews)
    }

    async fn state(&self, config: &WatchConfig, action: &StateAction) -> Result<ScanExit> {
        let scan_name = config.scan.name.as_str();
        let state = StateManager::open(&config.state.path, scan_name);

        match action {
            StateAction::Show => {
                let scan_state = state.scan_state(scan_name).await;
                self.output_message(&json!({
                    "type": "STATE",
                    "scan": scan_name,
                    "path": state.path(),
                    "next_id": state.load_cursor(scan_name, config.scan.seed_id).await.saturating_add(1),
                    "state": scan_state,
                }));
            }
            StateAction::Set { id } => {
                state.set_cursor(scan_name, *id).await;
                state.save().await?;
                info!("Cursor of '{scan_name}' set to {id}");
            }
            StateAction::Reset => {
                if state.reset(scan_name).await {
                    state.save().await?;
                    info!("State of '{scan_name}' cleared");
                } else {
                    warn!("No state stored for '{scan_name}'");
                }
            }
        }

        Ok(ScanExit::NoNews)
    }

    fn records(&self, config: &WatchConfig, action: &RecordsAction) -> Result<ScanExit> {
        let store = Self::open_records(config)?
            .ok_or_else(|| Error::missing_field("records.database"))?;

        match action {
            RecordsAction::List { limit, filter } => {
                let rows = store.list(*limit, filter.as_deref())?;
                self.output_message(&json!({ "type": "RECORDS", "records": rows }));
            }
            RecordsAction::Stats => {
                let target = config.scan.target_category.as_deref().unwrap_or_default();
                let stats = store.stats(target, config.scan.category_match)?;
                self.output_message(&json!({ "type": "STATS", "stats": stats }));
            }
            RecordsAction::Export { path } => {
                let count = store.export_csv(path)?;
                info!("Exported {count} records to {}", path.display());
            }
            RecordsAction::ResetNotified => {
                let count = store.reset_notified()?;
                info!("Reset notified flag on {count} records");
            }
            RecordsAction::Delete { id } => {
                if store.delete(*id)? {
                    info!("Deleted record {id}");
                } else {
                    return Err(Error::records(format!("No record with id {id}")));
                }
            }
        }

        Ok(ScanExit::NoNews)
    }

    async fn test_notify(&self, config: &WatchConfig) -> Result<ScanExit> {
        if config.notify.telegram.credentials().is_none() {
            return Err(Error::notify(
                "Telegram is not configured (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID)",
            ));
        }

        let notifier = notifier_from_config(&config.notify.telegram)?;
        notifier.send_text(&test_message(Utc::now())).await?;
        info!("Test message sent");
        Ok(ScanExit::NoNews)
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
