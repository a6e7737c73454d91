use crate::context::SyncContext;
use crate::error::SyncError;

pub(super) async fn run(ctx: &SyncContext) -> Result<usize, SyncError> {
    let repository = ctx.ratings();
    repository
        .preload(&repository.enabled_kinds(), &ctx.cancel)
        .await
}
