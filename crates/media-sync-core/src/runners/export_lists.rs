use media_sync_models::{CustomList, MediaKind, TraktId};
use media_sync_sources::{SyncItem, SyncItemsRequest};
use tracing::{debug, info};

use super::{rate_limit, ProgressFn, EXPORT_CHUNK_SIZE};
use crate::cancel;
use crate::context::SyncContext;
use crate::error::SyncError;

/// Create unsynced lists remotely and push list items the remote lacks.
pub(super) async fn run(ctx: &SyncContext, progress: ProgressFn<'_>) -> Result<usize, SyncError> {
    let lists = ctx.store.read(|t| t.custom_lists.get_all()).await;

    let mut exported = 0;
    for list in lists {
        cancel::check(&ctx.cancel)?;
        let movies_enabled = ctx.movies_enabled();
        let pending: Vec<_> = ctx
            .store
            .read(|t| t.pending_list_items(list.id))
            .await
            .into_iter()
            .filter(|i| i.kind != MediaKind::Movie || movies_enabled)
            .collect();

        if list.trakt_id.is_some() && pending.is_empty() {
            continue;
        }

        progress(&format!("Exporting:\n\n\"{}\"...", list.name));
        let remote_id = ensure_remote_list(ctx, &list).await?;

        for chunk in pending.chunks(EXPORT_CHUNK_SIZE) {
            let mut request = SyncItemsRequest::default();
            for item in chunk {
                request.push_media(item.kind, SyncItem::new(item.trakt_id));
            }
            cancel::remote(&ctx.cancel, ctx.remote.post_list_items(remote_id, &request)).await?;

            ctx.store
                .write(|t| t.exported_list_items.extend(chunk.iter().map(|i| i.id)))
                .await;
            exported += chunk.len();
            rate_limit(ctx).await?;
        }
        debug!(list = %list.name, items = pending.len(), "List exported");
    }

    if exported > 0 {
        info!(count = exported, "Exported custom list items");
    }
    Ok(exported)
}

async fn ensure_remote_list(ctx: &SyncContext, list: &CustomList) -> Result<TraktId, SyncError> {
    if let Some(id) = list.trakt_id {
        return Ok(id);
    }

    let created = cancel::remote(
        &ctx.cancel,
        ctx.remote
            .create_list(&list.name, list.description.as_deref(), &list.privacy),
    )
    .await?;

    let local_id = list.id;
    ctx.store
        .write(|t| {
            if let Some(local) = t.custom_lists.get_mut(&local_id) {
                local.trakt_id = Some(created.trakt_id);
                local.slug = created.slug.clone();
            }
        })
        .await;
    info!(list = %list.name, trakt_id = created.trakt_id, "Created remote list");
    Ok(created.trakt_id)
}

#[cfg(test)]
mod tests {
    use crate::runners::{no_progress, SyncRunner};
    use crate::testing::{context, FakeRemote};
    use chrono::Utc;
    use media_sync_models::{CustomList, MediaKind};
    use media_sync_sources::SourceError;
    use media_sync_store::StoreError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_creates_list_then_pushes_items() {
        let remote = Arc::new(FakeRemote::default());
        let ctx = context(remote.clone());
        let list_id = ctx
            .store
            .write(|t| {
                let id = t.insert_list(CustomList::create("Weekend", None))?;
                t.add_to_list(id, 1, MediaKind::Show, Utc::now(), Utc::now(), Utc::now())?;
                t.add_to_list(id, 2, MediaKind::Movie, Utc::now(), Utc::now(), Utc::now())?;
                Ok::<_, StoreError>(id)
            })
            .await
            .unwrap();

        assert_eq!(SyncRunner::ExportLists.run(&ctx, &no_progress).await.unwrap(), 2);

        let trakt_id = ctx
            .store
            .read(|t| t.custom_lists.get(&list_id).and_then(|l| l.trakt_id))
            .await
            .unwrap();
        let posted = remote.posted_list_items.lock().unwrap().clone();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, trakt_id);
        assert_eq!(posted[0].1.shows.len(), 1);
        assert_eq!(posted[0].1.movies.len(), 1);

        // Nothing pending on the second pass
        assert_eq!(SyncRunner::ExportLists.run(&ctx, &no_progress).await.unwrap(), 0);
        assert_eq!(remote.calls("create_list"), 1);
    }

    #[tokio::test]
    async fn test_account_limits_surface() {
        let remote = FakeRemote::default();
        remote.fail("create_list", SourceError::AccountLimits("lists".to_string()));
        let ctx = context(Arc::new(remote));
        ctx.store
            .write(|t| t.insert_list(CustomList::create("One too many", None)))
            .await
            .unwrap();

        let error = SyncRunner::ExportLists.run(&ctx, &no_progress).await.unwrap_err();
        assert!(error.is_account_limits());
    }
}
