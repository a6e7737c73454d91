use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use commands::{auth, backup, clear, config, daemon, rate, status, sync};
use media_sync_config::{SnoozeTarget, SyncSchedule};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reelsync")]
#[command(about = "ReelSync - Keep your watch history, lists and ratings in sync with Trakt")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full sync with Trakt
    #[command(long_about = "Import watched history, watchlist, custom lists and ratings from Trakt, then export local changes back. Use --import-only or --export-only to run one direction.")]
    Sync {
        /// Only pull changes from Trakt
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "export_only")]
        import_only: bool,

        /// Only push local changes to Trakt
        #[arg(long, action = ArgAction::SetTrue)]
        export_only: bool,

        /// Do not report success or failure when done
        #[arg(long, action = ArgAction::SetTrue)]
        silent: bool,
    },
    /// Push pending watched history and list changes
    QuickSync,
    /// Run in the foreground with the periodic scheduler
    #[command(long_about = "Run ReelSync as a long-lived process that syncs on the configured schedule. Ctrl-C cancels a running sync and exits.")]
    Daemon {
        /// Override the configured schedule
        #[arg(long, value_enum)]
        schedule: Option<ScheduleArg>,

        /// Skip the sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
    /// Export or import a backup file
    Backup {
        #[command(subcommand)]
        cmd: BackupCommands,
    },
    /// Rate a show, season, episode or movie
    Rate {
        #[command(flatten)]
        target: rate::RateTarget,

        /// Rating from 0 to 10
        #[arg(value_parser = clap::value_parser!(u8).range(0..=10))]
        rating: u8,

        /// Store the rating locally without sending it to Trakt
        #[arg(long, action = ArgAction::SetTrue)]
        local_only: bool,
    },
    /// Remove a rating
    Unrate {
        #[command(flatten)]
        target: rate::RateTarget,

        /// Remove the rating locally without touching Trakt
        #[arg(long, action = ArgAction::SetTrue)]
        local_only: bool,
    },
    /// Silence an account limits notification for 30 days
    Snooze {
        #[arg(value_enum)]
        target: SnoozeArg,
    },
    /// Show local store counts and sync state
    Status,
    /// Authorize ReelSync with your Trakt account
    Auth {
        /// Revoke the stored token instead
        #[arg(long, action = ArgAction::SetTrue)]
        revoke: bool,
    },
    /// Configure credentials and settings
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
    /// Clear local data
    #[command(long_about = "Clear the local store, stored credentials or the last sync timestamp. Asks for confirmation unless --yes is given.")]
    Clear {
        /// Clear everything
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Delete the local store snapshot
        #[arg(long, action = ArgAction::SetTrue)]
        store: bool,

        /// Delete stored credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,

        /// Forget the last sync time and snoozed notifications
        #[arg(long, action = ArgAction::SetTrue)]
        timestamps: bool,

        /// Do not ask for confirmation
        #[arg(short, long, action = ArgAction::SetTrue)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Write the local store to a backup file
    Export {
        /// Target file or directory (defaults to a timestamped file in the current directory)
        #[arg(long, short)]
        path: Option<std::path::PathBuf>,
    },
    /// Import a backup file into the local store
    Import {
        file: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure Trakt API credentials
    #[command(long_about = "Configure Trakt API credentials. You'll need to create a Trakt API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,
    },

    /// Configure sync options
    Sync {
        /// Import and export movies
        #[arg(long)]
        movies_enabled: Option<bool>,

        /// Import shows and movies in parallel
        #[arg(long)]
        concurrent_import: Option<bool>,

        /// Periodic sync schedule
        #[arg(long, value_enum)]
        schedule: Option<ScheduleArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScheduleArg {
    Off,
    #[value(name = "every-3-hours")]
    Every3Hours,
    #[value(name = "every-6-hours")]
    Every6Hours,
    #[value(name = "every-12-hours")]
    Every12Hours,
    Daily,
}

impl From<ScheduleArg> for SyncSchedule {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Off => SyncSchedule::Off,
            ScheduleArg::Every3Hours => SyncSchedule::Every3Hours,
            ScheduleArg::Every6Hours => SyncSchedule::Every6Hours,
            ScheduleArg::Every12Hours => SyncSchedule::Every12Hours,
            ScheduleArg::Daily => SyncSchedule::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SnoozeArg {
    Lists,
    Watchlist,
}

impl From<SnoozeArg> for SnoozeTarget {
    fn from(arg: SnoozeArg) -> Self {
        match arg {
            SnoozeArg::Lists => SnoozeTarget::CustomLists,
            SnoozeArg::Watchlist => SnoozeTarget::Watchlist,
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The daemon logs to a rotating file instead of stderr
    if !matches!(cli.command, Commands::Daemon { .. }) {
        logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    }

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync {
            import_only,
            export_only,
            silent,
        } => sync::run_sync(!export_only, !import_only, silent, &output).await,
        Commands::QuickSync => sync::run_quick_sync(&output).await,
        Commands::Daemon {
            schedule,
            no_startup_sync,
        } => daemon::run_daemon(schedule.map(Into::into), no_startup_sync, cli.verbose, cli.quiet, &output).await,
        Commands::Backup { cmd } => match cmd {
            BackupCommands::Export { path } => backup::run_export(path, &output).await,
            BackupCommands::Import { file } => backup::run_import(file, &output).await,
        },
        Commands::Rate {
            target,
            rating,
            local_only,
        } => rate::run_rate(target, rating, !local_only, &output).await,
        Commands::Unrate { target, local_only } => rate::run_unrate(target, !local_only, &output).await,
        Commands::Snooze { target } => sync::run_snooze(target.into(), &output).await,
        Commands::Status => status::run_status(&output).await,
        Commands::Auth { revoke } => auth::run_auth(revoke, &output).await,
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
            config::run_config(cmd, &output).await
        }
        Commands::Clear {
            all,
            store,
            credentials,
            timestamps,
            yes,
        } => clear::run_clear(all, store, credentials, timestamps, yes, &output).await,
    }
}
