use super::open_store;
use crate::output::{Output, OutputFormat};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use media_sync_config::{CredentialStore, PathManager, SnoozeTarget};
use media_sync_models::{CollectionKind, MediaKind, RatingKind};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug)]
struct StoreCounts {
    collections: Vec<(MediaKind, CollectionKind, usize)>,
    watched_episodes: usize,
    ratings: Vec<(RatingKind, usize)>,
    lists: usize,
    list_items: usize,
    pending_episodes: usize,
    pending_movies: usize,
    pending_list_items: usize,
}

pub async fn run_status(output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let store = open_store(&paths)?;

    let mut cred_store = CredentialStore::new(paths.credentials_file());
    cred_store
        .load()
        .map_err(|e| eyre!("Failed to load credentials: {}", e))?;

    let counts = store
        .read(|t| {
            let collections = MediaKind::ALL
                .into_iter()
                .flat_map(|media| CollectionKind::ALL.into_iter().map(move |kind| (media, kind)))
                .map(|(media, kind)| (media, kind, t.collection(media, kind).len()))
                .collect();
            let ratings = RatingKind::ALL
                .into_iter()
                .map(|kind| (kind, t.ratings_by_kind(kind).len()))
                .collect();
            StoreCounts {
                collections,
                watched_episodes: t.episodes.iter().filter(|e| e.is_watched).count(),
                ratings,
                lists: t.custom_lists.len(),
                list_items: t.custom_list_items.len(),
                pending_episodes: t.pending_episode_exports().len(),
                pending_movies: t.pending_movie_exports().len(),
                pending_list_items: t.custom_lists.iter().map(|l| t.pending_list_items(l.id).len()).sum(),
            }
        })
        .await;

    let last_sync = cred_store
        .get_last_sync_timestamp()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let snoozed: Vec<&str> = [SnoozeTarget::CustomLists, SnoozeTarget::Watchlist]
        .into_iter()
        .filter(|target| cred_store.is_snoozed(*target, chrono::Utc::now()))
        .map(|target| target.key())
        .collect();

    if output.format() != OutputFormat::Human {
        output.json(&json!({
            "authorized": cred_store.is_trakt_authorized(),
            "last_sync": last_sync,
            "snoozed": snoozed,
            "collections": counts.collections.iter().map(|(media, kind, count)| {
                json!({ "media": media.as_str(), "collection": format!("{:?}", kind).to_lowercase(), "count": count })
            }).collect::<Vec<_>>(),
            "watched_episodes": counts.watched_episodes,
            "ratings": counts.ratings.iter().map(|(kind, count)| json!({ "kind": kind.as_str(), "count": count })).collect::<Vec<_>>(),
            "lists": counts.lists,
            "list_items": counts.list_items,
            "pending": {
                "episodes": counts.pending_episodes,
                "movies": counts.pending_movies,
                "list_items": counts.pending_list_items,
            },
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    println!("\n{}", "ReelSync status".bright_cyan().bold());
    println!();

    let mut account = Table::new();
    account.set_header(vec![Cell::new("Trakt").fg(Color::Cyan).add_attribute(Attribute::Bold)]);
    account.add_row(vec![
        Cell::new("Authorized"),
        Cell::new(if cred_store.is_trakt_authorized() {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        }),
    ]);
    account.add_row(vec![Cell::new("Last sync"), Cell::new(last_sync.as_deref().unwrap_or("never"))]);
    if !snoozed.is_empty() {
        account.add_row(vec![Cell::new("Snoozed"), Cell::new(snoozed.join(", "))]);
    }
    print_table(account);

    let mut library = Table::new();
    library.set_header(vec![
        Cell::new("Library").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
    ]);
    for (media, kind, count) in &counts.collections {
        library.add_row(vec![Cell::new(format!("{}s: {:?}", media, kind)), Cell::new(count)]);
    }
    library.add_row(vec![Cell::new("Watched episodes"), Cell::new(counts.watched_episodes)]);
    for (kind, count) in &counts.ratings {
        library.add_row(vec![Cell::new(format!("Rated {}s", kind)), Cell::new(count)]);
    }
    library.add_row(vec![Cell::new("Custom lists"), Cell::new(counts.lists)]);
    library.add_row(vec![Cell::new("List items"), Cell::new(counts.list_items)]);
    print_table(library);

    let mut pending = Table::new();
    pending.set_header(vec![
        Cell::new("Pending export").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Count").add_attribute(Attribute::Bold),
    ]);
    pending.add_row(vec![Cell::new("Episodes"), Cell::new(counts.pending_episodes)]);
    pending.add_row(vec![Cell::new("Movies"), Cell::new(counts.pending_movies)]);
    pending.add_row(vec![Cell::new("List items"), Cell::new(counts.pending_list_items)]);
    print_table(pending);

    Ok(())
}

fn print_table(mut table: Table) {
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    println!("{}", table);
    println!();
}
