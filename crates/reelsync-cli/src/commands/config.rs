use super::prompts;
use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use media_sync_config::{Config, PathManager, SyncSchedule, TraktConfig};
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output),
        ConfigCommands::Trakt {
            client_id,
            client_secret,
        } => configure_trakt(client_id, client_secret, output),
        ConfigCommands::Sync {
            movies_enabled,
            concurrent_import,
            schedule,
        } => configure_sync(movies_enabled, concurrent_import, schedule.map(Into::into), output),
    }
}

/// Load the config file or start from defaults when it does not exist yet.
fn load_or_default(paths: &PathManager, output: &Output) -> Result<Config> {
    paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;
    let config_file = paths.config_file();
    if !config_file.exists() {
        output.info("Configuration file not found. Creating default configuration...");
        return Ok(Config::default());
    }
    Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))
}

fn save(config: &Config, paths: &PathManager) -> Result<()> {
    let config_file = paths.config_file();
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config_file = paths.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'reelsync config trakt' to create it.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    if output.format() != OutputFormat::Human {
        let trakt = config.trakt.as_ref().map(|trakt| {
            json!({
                "enabled": trakt.enabled,
                "client_id": if full { trakt.client_id.clone() } else { mask_string(&trakt.client_id) },
                "client_secret": if full { trakt.client_secret.clone() } else { mask_string(&trakt.client_secret) },
                "api_url": trakt.api_url,
            })
        });
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "trakt": trakt,
            "sync": {
                "movies_enabled": config.sync.movies_enabled,
                "concurrent_import": config.sync.concurrent_import,
                "quick_sync_delay_secs": config.sync.quick_sync_delay_secs,
                "max_import_retries": config.sync.retry.max_import_retries,
                "max_export_retries": config.sync.retry.max_export_retries,
                "retry_delay_ms": config.sync.retry.retry_delay_ms,
                "rate_limit_delay_ms": config.sync.retry.rate_limit_delay_ms,
            },
            "scheduler": {
                "schedule": config.scheduler.schedule.as_str(),
                "run_on_startup": config.scheduler.run_on_startup,
            },
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    println!("\n{}", "Configuration".bright_cyan().bold());
    println!("{}\n", config_file.display().to_string().bright_black());

    let mut trakt_table = section("Trakt");
    match &config.trakt {
        Some(trakt) => {
            trakt_table.add_row(vec![Cell::new("Enabled"), Cell::new(check(trakt.enabled))]);
            let client_id = if full { trakt.client_id.clone() } else { mask_string(&trakt.client_id) };
            let client_secret = if full { trakt.client_secret.clone() } else { mask_string(&trakt.client_secret) };
            trakt_table.add_row(vec![Cell::new("Client ID"), Cell::new(client_id)]);
            trakt_table.add_row(vec![Cell::new("Client Secret"), Cell::new(client_secret)]);
            trakt_table.add_row(vec![Cell::new("API URL"), Cell::new(&trakt.api_url)]);
        }
        None => {
            trakt_table.add_row(vec![Cell::new("Not configured".bright_black().to_string())]);
        }
    }
    print_table(trakt_table);

    let sync = &config.sync;
    let mut sync_table = section("Sync Options");
    sync_table.add_row(vec![Cell::new("Movies"), Cell::new(check(sync.movies_enabled))]);
    sync_table.add_row(vec![Cell::new("Concurrent import"), Cell::new(check(sync.concurrent_import))]);
    sync_table.add_row(vec![Cell::new("Quick sync delay"), Cell::new(format!("{}s", sync.quick_sync_delay_secs))]);
    sync_table.add_row(vec![
        Cell::new("Retries (import / export)"),
        Cell::new(format!("{} / {}", sync.retry.max_import_retries, sync.retry.max_export_retries)),
    ]);
    sync_table.add_row(vec![Cell::new("Retry delay"), Cell::new(format!("{} ms", sync.retry.retry_delay_ms))]);
    sync_table.add_row(vec![Cell::new("Rate limit delay"), Cell::new(format!("{} ms", sync.retry.rate_limit_delay_ms))]);
    print_table(sync_table);

    let mut scheduler_table = section("Scheduler");
    scheduler_table.add_row(vec![Cell::new("Schedule"), Cell::new(config.scheduler.schedule)]);
    scheduler_table.add_row(vec![Cell::new("Sync on startup"), Cell::new(check(config.scheduler.run_on_startup))]);
    print_table(scheduler_table);

    Ok(())
}

fn configure_trakt(
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();
    let mut config = load_or_default(&paths, output)?;

    output.info("Create a Trakt API application at https://trakt.tv/oauth/applications");
    output.info("Use 'urn:ietf:wg:oauth:2.0:oob' as the redirect URI.\n");

    let existing = config.trakt.clone();
    let client_id = match client_id_arg {
        Some(id) => id,
        None => prompts::prompt_string("Trakt Client ID", existing.as_ref().map(|t| t.client_id.as_str()))?,
    };
    let client_secret = match client_secret_arg {
        Some(secret) => secret,
        None => prompts::prompt_secret("Trakt Client Secret")?,
    };

    let mut trakt = TraktConfig::new(client_id.trim().to_string(), client_secret);
    if let Some(existing) = existing {
        trakt.api_url = existing.api_url;
        trakt.redirect_uri = existing.redirect_uri;
    }
    config.trakt = Some(trakt);
    config
        .validate()
        .map_err(|e| eyre!("Configuration validation failed: {}", e))?;
    save(&config, &paths)?;

    output.success("Trakt configured");
    output.info("Run 'reelsync auth' to sign in.");
    Ok(())
}

fn configure_sync(
    movies_enabled: Option<bool>,
    concurrent_import: Option<bool>,
    schedule: Option<SyncSchedule>,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();
    let mut config = load_or_default(&paths, output)?;

    let nothing_given = movies_enabled.is_none() && concurrent_import.is_none() && schedule.is_none();
    if nothing_given {
        config.sync.movies_enabled = prompts::prompt_yes_no("Sync movies?", config.sync.movies_enabled)?;
        config.sync.concurrent_import =
            prompts::prompt_yes_no("Import shows and movies in parallel?", config.sync.concurrent_import)?;
    } else {
        if let Some(value) = movies_enabled {
            config.sync.movies_enabled = value;
        }
        if let Some(value) = concurrent_import {
            config.sync.concurrent_import = value;
        }
        if let Some(value) = schedule {
            config.scheduler.schedule = value;
        }
    }

    save(&config, &paths)?;
    output.success("Sync options saved");
    if schedule.is_some() {
        output.info("Restart a running daemon to apply the new schedule.");
    }
    Ok(())
}

fn section(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    table
}

fn print_table(mut table: Table) {
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    println!();
}

fn check(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

fn mask_string(s: &str) -> String {
    if s.len() <= 4 {
        "*".repeat(s.len())
    } else {
        format!("{}{}", &s[..4], "*".repeat(s.len() - 4))
    }
}
