//! `wsync` - CLI for workshop-sync
//!
//! This binary captures workshop records into the local store, syncs them to
//! the remote service, and exposes the service's lookups and reports.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tracing::{debug, warn};

use workshop_sync::cli::{
    CaptureCommand, Cli, Command, ConfigCommand, ExportCommand, RecentCommand, SearchCommand,
};
use workshop_sync::config::{validate_api_base, API_BASE_SETTING};
use workshop_sync::remote::{ExportRequest, SearchResults};
use workshop_sync::{
    init_logging, ApiClient, CaptureService, Config, Error, FailurePolicy, Fields, LocalStore,
    RemoteService, Result, SyncCoordinator, SyncOutcome,
};

/// Everything a command handler may need, resolved once at startup.
#[derive(Debug)]
struct App {
    config: Config,
    store: Option<LocalStore>,
    store_error: Option<String>,
    api_base: String,
}

impl App {
    async fn open(config: Config, explicit_base: Option<&str>) -> Result<Self> {
        let (store, store_error) = match LocalStore::open(config.database_path()) {
            Ok(store) => (Some(store), None),
            Err(err) if err.is_storage_unavailable() => {
                warn!("Local store unavailable: {}", err);
                (None, Some(err.to_string()))
            }
            Err(err) => return Err(err),
        };

        let persisted = match &store {
            Some(store) => store.setting(API_BASE_SETTING).await.unwrap_or_else(|err| {
                warn!("Could not read persisted API base: {}", err);
                None
            }),
            None => None,
        };
        let api_base = config.resolve_api_base(explicit_base, persisted.as_deref());
        debug!("Using API base {}", api_base);

        Ok(Self {
            config,
            store,
            store_error,
            api_base,
        })
    }

    fn api(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_base, &self.config.remote)
    }

    fn store(&self) -> Result<&LocalStore> {
        self.store.as_ref().ok_or_else(|| Error::StorageUnavailable {
            reason: self
                .store_error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn coordinator(&self, store: &LocalStore, api: Arc<ApiClient>) -> SyncCoordinator {
        SyncCoordinator::new(
            store.clone(),
            api,
            FailurePolicy::from(&self.config.sync),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // These work even when the configured file is broken.
    match &cli.command {
        Command::Config(ConfigCommand::Path) => {
            println!(
                "{}",
                cli.config
                    .clone()
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
            return Ok(ExitCode::SUCCESS);
        }
        Command::Config(ConfigCommand::Validate { file }) => {
            return Ok(handle_validate(file.clone().or_else(|| cli.config.clone())));
        }
        _ => {}
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    if let Some(base) = cli.api_base.as_deref() {
        validate_api_base(base).context("invalid --api-base")?;
    }

    let app = match App::open(config, cli.api_base.as_deref()).await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("{}", err.notification());
            return Ok(ExitCode::FAILURE);
        }
    };
    if let Some(reason) = &app.store_error {
        if cli.command.is_remote_only() {
            eprintln!("Warning: working online only, local store unavailable: {reason}");
        }
    }

    // Execute the command
    let result = match cli.command {
        Command::Capture(cmd) => handle_capture(&app, cmd).await,
        Command::Sync => handle_sync(&app).await,
        Command::Pending(cmd) => handle_pending(&app, cmd.json).await,
        Command::Status(cmd) => handle_status(&app, cmd.json).await,
        Command::Search(cmd) => handle_search(&app, &cmd).await,
        Command::Recent(cmd) => handle_recent(&app, &cmd).await,
        Command::Export(cmd) => handle_export(&app, &cmd).await,
        Command::Repair => handle_repair(&app).await,
        Command::Config(cmd) => handle_config(&app, cmd).await,
    };

    match result {
        Ok(code) => Ok(code),
        Err(err) => {
            eprintln!("{}", err.notification());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn handle_capture(app: &App, cmd: CaptureCommand) -> Result<ExitCode> {
    let store = app.store()?;
    let api = Arc::new(app.api()?);
    let coordinator = Arc::new(app.coordinator(store, api.clone()));
    let capture = CaptureService::new(store.clone(), coordinator, api);

    let fields: Fields = cmd.fields.into_iter().collect();
    let receipt = capture.submit(cmd.collection, fields).await?;

    println!(
        "Saved {} record #{} for {}",
        receipt.collection,
        receipt.record.id.unwrap_or_default(),
        receipt.key().unwrap_or("-")
    );
    if receipt.is_synced() {
        println!("Sent to the remote service.");
    } else {
        println!("Queued locally; run `wsync sync` once the service is reachable.");
    }
    if let Some(results) = &receipt.search {
        print_search(results);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_sync(app: &App) -> Result<ExitCode> {
    let store = app.store()?;
    let coordinator = app.coordinator(store, Arc::new(app.api()?));

    let outcome = coordinator.sync_all().await?;
    println!("{outcome}");
    Ok(match outcome {
        SyncOutcome::Failed { .. } => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

async fn handle_pending(app: &App, json: bool) -> Result<ExitCode> {
    let store = app.store()?;
    let counts = store.pending_counts().await?;
    let in_flight = store.in_flight().await?;

    if json {
        let value = serde_json::json!({
            "collections": counts,
            "in_flight": in_flight,
            "total": counts.values().sum::<usize>() + in_flight,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(ExitCode::SUCCESS);
    }

    let total: usize = counts.values().sum();
    if total == 0 && in_flight == 0 {
        println!("Nothing pending.");
        return Ok(ExitCode::SUCCESS);
    }
    for (collection, count) in counts.iter().filter(|(_, count)| **count > 0) {
        println!("{:<16} {}", collection.as_str(), count);
    }
    if in_flight > 0 {
        println!("{:<16} {}", "(in flight)", in_flight);
    }
    println!("{:<16} {}", "total", total + in_flight);
    Ok(ExitCode::SUCCESS)
}

async fn handle_status(app: &App, json: bool) -> Result<ExitCode> {
    let online = match app.api() {
        Ok(api) => api.health().await,
        Err(err) => {
            warn!("Cannot build API client: {}", err);
            false
        }
    };
    let stats = match &app.store {
        Some(store) => Some(store.stats().await?),
        None => None,
    };

    if json {
        let status = serde_json::json!({
            "online": online,
            "api_base": app.api_base,
            "database_path": app.config.database_path(),
            "storage_available": stats.is_some(),
            "pending": stats.as_ref().map(|s| s.total_pending),
            "in_flight": stats.as_ref().map(|s| s.in_flight),
            "oldest_pending": stats.as_ref().and_then(|s| s.oldest_pending),
            "db_size_bytes": stats.as_ref().map(|s| s.db_size_bytes),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("wsync status");
    println!("------------");
    println!(
        "Remote:        {} ({})",
        if online { "online" } else { "offline" },
        app.api_base
    );
    println!("Database:      {}", app.config.database_path().display());
    match stats {
        Some(stats) => {
            println!("Pending:       {}", stats.total_pending);
            if stats.in_flight > 0 {
                println!("In flight:     {}", stats.in_flight);
            }
            if let Some(oldest) = stats.oldest_pending {
                println!("Oldest:        {}", oldest.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("Size:          {} bytes", stats.db_size_bytes);
        }
        None => println!("Storage:       unavailable (degraded, online only)"),
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_search(app: &App, cmd: &SearchCommand) -> Result<ExitCode> {
    let api = app.api()?;
    let results = api.search(&cmd.key).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No records for {}", cmd.key.trim());
    } else {
        print_search(&results);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_recent(app: &App, cmd: &RecentCommand) -> Result<ExitCode> {
    let api = app.api()?;
    let items = api.last3(cmd.equipment.into()).await?;

    if items.is_empty() {
        println!("No recent records.");
    }
    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_export(app: &App, cmd: &ExportCommand) -> Result<ExitCode> {
    let api = app.api()?;
    let request = ExportRequest::new(
        cmd.scope.into(),
        cmd.from.clone().filter(|d| !d.is_empty()),
        cmd.to.clone().filter(|d| !d.is_empty()),
    );
    let file = api.export_xlsx(&request).await?;

    // Only the final path component of a server-supplied name is used.
    let name = Path::new(&file.filename)
        .file_name()
        .map_or_else(|| request.filename.clone(), |n| n.to_string_lossy().into_owned());
    tokio::fs::create_dir_all(&cmd.output)
        .await
        .map_err(|source| Error::DirectoryCreate {
            path: cmd.output.clone(),
            source,
        })?;
    let target = cmd.output.join(name);
    tokio::fs::write(&target, &file.bytes).await?;

    println!("Saved {} ({} bytes)", target.display(), file.bytes.len());
    Ok(ExitCode::SUCCESS)
}

async fn handle_repair(app: &App) -> Result<ExitCode> {
    let api = app.api()?;
    if api.repair().await? {
        println!("Remote schema repaired.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Remote service reported the repair did not complete.");
        Ok(ExitCode::FAILURE)
    }
}

async fn handle_config(app: &App, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut value = serde_json::to_value(&app.config)?;
                value["effective_api_base"] = serde_json::Value::String(app.api_base.clone());
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let config = &app.config;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Remote]");
                println!("  Configured base:    {}", config.remote.api_base);
                println!("  Effective base:     {}", app.api_base);
                println!("  Query timeout (s):  {}", config.remote.query_timeout_secs);
                println!("  Export timeout (s): {}", config.remote.export_timeout_secs);
                println!();
                println!("[Sync]");
                println!("  Requeue on failure: {}", config.sync.requeue_on_failure);
            }
        }
        ConfigCommand::SetApiBase { url } => {
            validate_api_base(&url)?;
            app.store()?
                .set_setting(API_BASE_SETTING, url.trim())
                .await?;
            println!("API base set to {}", url.trim());
        }
        ConfigCommand::UnsetApiBase => {
            if app.store()?.remove_setting(API_BASE_SETTING).await? {
                println!("Persisted API base removed; using {}", app.config.remote.api_base);
            } else {
                println!("No persisted API base.");
            }
        }
        ConfigCommand::Path | ConfigCommand::Validate { .. } => {
            // Answered before the configuration is loaded.
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_validate(file: Option<std::path::PathBuf>) -> ExitCode {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => {
            println!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Configuration error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_search(results: &SearchResults) {
    for (group, kinds) in [("engines", &results.engines), ("generators", &results.generators)] {
        for (kind, items) in kinds.iter().filter(|(_, items)| !items.is_empty()) {
            println!("{group}/{kind}: {}", items.len());
            for item in items {
                println!("  {item}");
            }
        }
    }
}
