use super::prompts;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_config::{CredentialStore, PathManager};
use std::fs;
use std::path::Path;
use tracing::info;

pub async fn run_clear(
    all: bool,
    store: bool,
    credentials: bool,
    timestamps: bool,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();

    let (store, credentials, timestamps) = if all {
        (true, true, true)
    } else {
        (store, credentials, timestamps)
    };

    if !store && !credentials && !timestamps {
        output.warn("No clear option specified. Use --store, --credentials, --timestamps, or --all");
        output.info("\nExample: reelsync clear --timestamps");
        return Ok(());
    }

    if !yes {
        let mut what = Vec::new();
        if store {
            what.push("the local store");
        }
        if credentials {
            what.push("stored credentials");
        }
        if timestamps && !credentials {
            what.push("sync timestamps");
        }
        let confirmed = prompts::prompt_yes_no(&format!("Delete {}?", what.join(" and ")), false)?;
        if !confirmed {
            output.info("Nothing cleared");
            return Ok(());
        }
    }

    if store {
        remove_file(&paths.store_file(), "local store", output)?;
    }
    if credentials {
        // Timestamps live in the credentials file and go with it
        remove_file(&paths.credentials_file(), "credentials", output)?;
    } else if timestamps {
        clear_timestamps(&paths, output)?;
    }

    Ok(())
}

fn remove_file(path: &Path, label: &str, output: &Output) -> Result<()> {
    if !path.exists() {
        output.info(format!("No {} found to clear", label));
        return Ok(());
    }
    fs::remove_file(path).map_err(|e| eyre!("Failed to remove {} at {}: {}", label, path.display(), e))?;
    info!(operation = "clear", file = %path.display(), "Removed {}", label);
    output.success(format!("Cleared {}: {}", label, path.display()));
    Ok(())
}

fn clear_timestamps(paths: &PathManager, output: &Output) -> Result<()> {
    let credentials_file = paths.credentials_file();
    if !credentials_file.exists() {
        output.info("No credentials file found, nothing to clear");
        return Ok(());
    }

    let mut cred_store = CredentialStore::new(credentials_file);
    cred_store
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {}", e))?;
    cred_store.clear_sync_state();
    cred_store
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.success("Cleared the last sync time and snoozed notifications");
    Ok(())
}
