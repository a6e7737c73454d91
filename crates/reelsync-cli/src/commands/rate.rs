use super::Session;
use crate::output::Output;
use clap::{Args, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_sync_core::RatedEntity;
use media_sync_models::TraktId;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RateKind {
    Show,
    Season,
    Episode,
    Movie,
}

#[derive(Debug, Args)]
pub struct RateTarget {
    #[arg(value_enum)]
    kind: RateKind,

    /// Trakt id of the show, season, episode or movie
    trakt_id: TraktId,

    /// Season number (seasons and episodes)
    #[arg(long)]
    season: Option<u32>,

    /// Episode number (episodes)
    #[arg(long)]
    episode: Option<u32>,
}

impl RateTarget {
    fn entity(&self) -> Result<RatedEntity> {
        let season = || {
            self.season
                .ok_or_else(|| eyre!("--season is required when rating a {:?}", self.kind))
        };
        Ok(match self.kind {
            RateKind::Show => RatedEntity::show(self.trakt_id),
            RateKind::Movie => RatedEntity::movie(self.trakt_id),
            RateKind::Season => RatedEntity::season(self.trakt_id, season()?),
            RateKind::Episode => {
                let episode = self
                    .episode
                    .ok_or_else(|| eyre!("--episode is required when rating an episode"))?;
                RatedEntity::episode(self.trakt_id, season()?, episode)
            }
        })
    }
}

pub async fn run_rate(
    target: RateTarget,
    rating: u8,
    with_sync: bool,
    output: &Output,
) -> Result<()> {
    let entity = target.entity()?;
    let session = Session::open(output).await?;

    let record = session
        .ctx()
        .ratings()
        .add_rating(entity, rating, with_sync)
        .await
        .map_err(|e| eyre!("Failed to rate {} {}: {}", entity.kind, entity.trakt_id, e))?;
    session.persist().await?;

    output.success(format!("Rated {} {} with {}/10", record.kind, record.trakt_id, record.rating));
    Ok(())
}

pub async fn run_unrate(target: RateTarget, with_sync: bool, output: &Output) -> Result<()> {
    let entity = target.entity()?;
    let session = Session::open(output).await?;

    let removed = session
        .ctx()
        .ratings()
        .delete_rating(entity, with_sync)
        .await
        .map_err(|e| eyre!("Failed to remove rating of {} {}: {}", entity.kind, entity.trakt_id, e))?;
    session.persist().await?;

    if removed {
        output.success(format!("Removed rating of {} {}", entity.kind, entity.trakt_id));
    } else {
        output.info(format!("{} {} was not rated", entity.kind, entity.trakt_id));
    }
    Ok(())
}
