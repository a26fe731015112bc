use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use mediabridge::config::Config;
use mediabridge::engine::{
    BridgeError, BridgeResult, CapabilityTier, ConsentLedger, ConsentOutcome, LocalCatalog,
    MediaBridge, UiLauncher, local::LedgerLauncher,
};
use std::process;
use std::sync::Arc;

/// Bridge plus the catalog it runs against
struct Session {
    catalog: Arc<LocalCatalog>,
    bridge: MediaBridge,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(volume) = &cli.volume {
        config.storage.volume_dir = Some(volume.clone());
    }
    if let Some(tier) = cli.tier {
        config.platform.tier = tier;
    }
    Ok(config)
}

fn open_session(config: &Config) -> Result<Session> {
    let volume = config.volume_dir()?;
    let catalog = Arc::new(
        LocalCatalog::open(&volume, &config.storage.logical_root, config.tier())
            .with_context(|| format!("Failed to open catalog for {}", volume.display()))?,
    );
    let launcher: Arc<dyn UiLauncher> = Arc::new(LedgerLauncher::new(&volume));
    let bridge = MediaBridge::new(catalog.clone(), config.bridge_settings(), Some(launcher));

    Ok(Session { catalog, bridge })
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::InitConfig => handle_init_config(),
        Commands::ResolveId { path } => {
            let session = open_session(&config)?;
            report(session.bridge.resolve_identifier_from_path(&path))
        }
        Commands::ResolvePath { identifier } => {
            let session = open_session(&config)?;
            report(session.bridge.resolve_path_from_identifier(&identifier))
        }
        Commands::Translate { identifier } => {
            let session = open_session(&config)?;
            report(session.bridge.translate_document_identifier(&identifier).map(Some))
        }
        Commands::Replace {
            identifier,
            staging,
        } => {
            let session = open_session(&config)?;
            let staging = staging.to_string_lossy();
            let result = session.bridge.replace_at_identifier(&identifier, &staging);
            if result.is_ok() {
                println!("Replaced {}", identifier);
                return Ok(());
            }
            report(result)
        }
        Commands::RequestWrite { identifiers } => {
            handle_request_write(&config, &identifiers)
        }
        Commands::Consent {
            token,
            approve,
            deny,
            dismiss: _,
        } => {
            let outcome = if approve {
                ConsentOutcome::Approved
            } else if deny {
                ConsentOutcome::Denied
            } else {
                ConsentOutcome::Dismissed
            };
            let session = open_session(&config)?;
            let entry = session.catalog.answer_consent(&token, outcome)?;
            println!(
                "Consent {} recorded for {}",
                format!("{:?}", outcome).to_lowercase(),
                entry.correlation_token
            );
            if outcome == ConsentOutcome::Approved {
                println!("Retry the replace to write the file.");
            }
            Ok(())
        }
        Commands::Pending => handle_pending(&config),
        Commands::Scan { owned } => {
            let session = open_session(&config)?;
            let added = session.catalog.scan(owned)?;
            println!(
                "Indexed {} new file(s) in {}",
                added,
                session.catalog.volume().display()
            );
            Ok(())
        }
        Commands::ScanFile { path, owned } => {
            let session = open_session(&config)?;
            let id = session.catalog.scan_file(&path, owned)?;
            println!("{}", mediabridge::engine::ResourceIdentifier::Content(id));
            Ok(())
        }
    }
}

/// Print a value (or "null") and exit non-zero on a bridge error
fn report(result: BridgeResult<Option<String>>) -> Result<()> {
    match result {
        Ok(Some(value)) => println!("{}", value),
        Ok(None) => println!("null"),
        Err(e) => fail(&e),
    }
    Ok(())
}

fn fail(err: &BridgeError) -> ! {
    eprintln!("{}: {}", err.code, err.message);
    if let Some(token) = &err.correlation_token {
        eprintln!("Answer the prompt with: mediabridge consent {} --approve", token);
    }
    process::exit(if err.code.is_retryable() { 2 } else { 1 });
}

fn handle_request_write(config: &Config, identifiers: &[String]) -> Result<()> {
    let session = open_session(config)?;
    let ids: Vec<&str> = identifiers.iter().map(String::as_str).collect();
    match session.bridge.request_write_permission(&ids) {
        Ok(_) => {
            // The launcher just appended the newest prompt to the ledger
            let ledger = ConsentLedger::load(session.catalog.volume())?;
            if let Some(entry) = ledger.pending.last() {
                println!("Write permission pending: {}", entry.correlation_token);
                println!(
                    "Answer the prompt with: mediabridge consent {} --approve",
                    entry.correlation_token
                );
            }
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

fn handle_pending(config: &Config) -> Result<()> {
    let volume = config.volume_dir()?;
    let ledger = ConsentLedger::load(&volume)?;
    if ledger.pending.is_empty() {
        println!("No pending consent prompts");
        return Ok(());
    }
    for entry in &ledger.pending {
        let issued = chrono::DateTime::from_timestamp(entry.issued_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{}  {}  {}",
            entry.correlation_token,
            issued,
            entry.action_handle.as_str()
        );
    }
    Ok(())
}

fn handle_init_config() -> Result<()> {
    let path = Config::config_path()?;

    if Config::exists() {
        println!("Config file exists at: {}", path.display());
        let config = Config::load()?;
        println!("  tier: {}", config.platform.tier);
        println!("  strategy: {:?}", CapabilityTier(config.platform.tier).strategy());
        println!("  logical_root: {}", config.storage.logical_root);
        match &config.storage.volume_dir {
            Some(dir) => println!("  volume_dir: {}", dir.display()),
            None => println!("  volume_dir: (current directory)"),
        }
        println!("  replace mode: {:?}", config.replace.mode);
    } else {
        Config::ensure_default()?;
        println!("Created default config at: {}", path.display());
    }

    Ok(())
}
