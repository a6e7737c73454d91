use chrono::Utc;
use media_sync_models::{CustomList, MediaKind};
use media_sync_sources::RemoteCustomList;
use media_sync_store::StoreError;
use tracing::{debug, warn};

use super::{item_status, ProgressFn};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;
use crate::progress::ProgressTracker;

pub(super) async fn run(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let remote_lists = cancel::remote(&ctx.cancel, ctx.remote.fetch_lists()).await?;

    let mut tracker = ProgressTracker::new("import_lists", remote_lists.len());
    let mut count = 0;
    for (idx, remote_list) in remote_lists.iter().enumerate() {
        cancel::check(&ctx.cancel)?;
        let list_id = resolve_local_list(ctx, remote_list).await?;
        match import_items(ctx, remote_list, list_id, progress).await {
            Ok(added) => {
                count += added;
                tracker.record_added();
            }
            // Deleted remotely since the lists were fetched
            Err(e) if e.is_not_found() => {
                warn!(list = %remote_list.name, error = %e, "Skipping list missing on the remote");
                tracker.record_failed();
            }
            Err(e) => return Err(e),
        }
        tracker.tick(idx + 1);
    }
    tracker.finish();
    Ok(count)
}

/// Local id of the list synced with `remote`, creating it when missing.
async fn resolve_local_list(
    ctx: &SyncContext,
    remote: &RemoteCustomList,
) -> Result<i64, SyncError> {
    let id = ctx
        .store
        .write(|t| {
            let existing = t
                .custom_lists
                .iter()
                .find(|l| l.trakt_id == Some(remote.trakt_id))
                .map(|l| l.id);
            if let Some(id) = existing {
                return Ok(id);
            }

            let now = Utc::now();
            t.insert_list(CustomList {
                id: 0,
                trakt_id: Some(remote.trakt_id),
                slug: remote.slug.clone(),
                name: remote.name.clone(),
                description: remote.description.clone(),
                privacy: remote.privacy.clone(),
                item_count: 0,
                created_at: remote.created_at.unwrap_or(now),
                updated_at: remote.updated_at.unwrap_or(now),
            })
        })
        .await?;
    Ok(id)
}

async fn import_items(
    ctx: &SyncContext,
    remote_list: &RemoteCustomList,
    list_id: i64,
    progress: ProgressFn<'_>,
) -> Result<usize, SyncError> {
    let entries = cancel::remote(&ctx.cancel, ctx.remote.fetch_list_items(remote_list.trakt_id)).await?;

    let mut tracker = ProgressTracker::new("import_list_items", entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        cancel::check(&ctx.cancel)?;
        if entry.kind == MediaKind::Movie && !ctx.movies_enabled() {
            tracker.record_skipped();
            tracker.tick(idx + 1);
            continue;
        }

        let now = Utc::now();
        let kind = entry.kind;
        let trakt_id = entry.media.trakt_id;
        let title = entry.media.title.clone();
        let listed_at = entry.listed_at.unwrap_or(now);

        let added = ctx
            .store
            .write(|t| {
                if !t.details(kind).exists(&trakt_id) {
                    t.details_mut(kind).upsert(entry.media);
                }
                let added = t.add_to_list(list_id, trakt_id, kind, listed_at, now, now)?;
                if let Some(item_id) = added {
                    // Came from the remote list, nothing to push back
                    t.exported_list_items.insert(item_id);
                }
                Ok::<_, StoreError>(added)
            })
            .await?;

        if added.is_some() {
            progress(&item_status("Importing", &title));
            tracker.record_added();
        } else {
            tracker.record_already_present();
        }
        tracker.tick(idx + 1);
    }

    debug!(list = %remote_list.name, added = tracker.added(), "List imported");
    tracker.finish();
    Ok(tracker.added())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::{no_progress, SyncRunner};
    use crate::testing::{context, details, FakeRemote};
    use media_sync_sources::{RemoteListEntry, SourceError};
    use std::sync::Arc;

    fn remote_list(trakt_id: i64, name: &str) -> RemoteCustomList {
        RemoteCustomList {
            trakt_id,
            slug: name.to_lowercase(),
            name: name.to_string(),
            description: None,
            privacy: "private".to_string(),
            item_count: 2,
            created_at: None,
            updated_at: None,
        }
    }

    fn entry(id: i64, kind: MediaKind, rank: i64) -> RemoteListEntry {
        RemoteListEntry {
            media: details(id, "Title"),
            kind,
            rank,
            listed_at: None,
        }
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let remote = FakeRemote::default();
        remote.lists.lock().unwrap().push(remote_list(50, "Favourites"));
        remote
            .list_items
            .lock()
            .unwrap()
            .insert(50, vec![entry(1, MediaKind::Show, 1), entry(2, MediaKind::Movie, 2)]);
        let ctx = context(Arc::new(remote));

        assert_eq!(SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap(), 2);
        assert_eq!(SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap(), 0);

        ctx.store
            .read(|t| {
                assert_eq!(t.custom_lists.len(), 1);
                let list = t.custom_lists.iter().next().unwrap();
                assert_eq!(list.trakt_id, Some(50));
                assert_eq!(list.item_count, 2);
                assert_eq!(t.list_items(list.id).len(), 2);
                assert!(t.pending_list_items(list.id).is_empty());
                assert!(t.movies.exists(&2));
            })
            .await;
    }

    #[tokio::test]
    async fn test_list_missing_on_remote_does_not_stop_the_rest() {
        let remote = FakeRemote::default();
        remote.lists.lock().unwrap().push(remote_list(50, "Favourites"));
        remote.lists.lock().unwrap().push(remote_list(60, "Classics"));
        remote.deleted_lists.lock().unwrap().push(50);
        remote
            .list_items
            .lock()
            .unwrap()
            .insert(60, vec![entry(1, MediaKind::Show, 1), entry(2, MediaKind::Movie, 2)]);
        let ctx = context(Arc::new(remote));

        let added = SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap();

        assert_eq!(added, 2);
        ctx.store
            .read(|t| {
                let classics = t.custom_lists.iter().find(|l| l.trakt_id == Some(60)).unwrap();
                assert_eq!(t.list_items(classics.id).len(), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn test_other_list_failures_abort() {
        let remote = Arc::new(FakeRemote::default());
        remote.lists.lock().unwrap().push(remote_list(50, "Favourites"));
        remote.fail("fetch_list_items", SourceError::Network("reset".to_string()));
        let ctx = context(remote);

        let error = SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap_err();

        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_merges_into_existing_list() {
        let remote = FakeRemote::default();
        remote.lists.lock().unwrap().push(remote_list(50, "Favourites"));
        remote
            .list_items
            .lock()
            .unwrap()
            .insert(50, vec![entry(1, MediaKind::Show, 1)]);
        let ctx = context(Arc::new(remote));

        let local_id = ctx
            .store
            .write(|t| {
                let mut list = CustomList::create("Favourites", None);
                list.trakt_id = Some(50);
                let id = t.insert_list(list)?;
                t.add_to_list(id, 9, MediaKind::Movie, Utc::now(), Utc::now(), Utc::now())?;
                Ok::<_, StoreError>(id)
            })
            .await
            .unwrap();

        SyncRunner::ImportLists.run(&ctx, &no_progress).await.unwrap();

        let items = ctx.store.read(|t| t.list_items(local_id)).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].trakt_id, 1);
    }
}
