mod app;
mod logging;

use app::App;
use clap::{Parser, Subcommand};
use gdmconfig::Config;
use gdmplaylist::Direction;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gdmusic", version, about = "Play your Google Drive music, online or from the local cache")]
struct Args {
    /// Configuration directory (default: $GDMUSIC_CONFIG, ./.gdmusic, ~/.gdmusic)
    #[arg(long, short = 'c', global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the audio files of the Drive
    Remote,

    /// Add the Drive audio files to the playlist
    Import {
        /// Replace the playlist instead of merging into it
        #[arg(long)]
        replace: bool,

        /// Only files whose name matches
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Print the playlist, `>` marks the active track
    List {
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Remove a track from the playlist
    Remove { id: String },

    /// Move a track before another one, or to the end
    Move {
        target: String,

        #[arg(long)]
        before: Option<String>,
    },

    /// Download tracks into the local cache (the whole playlist by default)
    Cache { ids: Vec<String> },

    /// Resolve the active track and write its content
    Play {
        /// Track to select first
        id: Option<String>,

        #[arg(long, conflicts_with = "prev")]
        next: bool,

        #[arg(long)]
        prev: bool,

        /// File receiving the audio content
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(dir) => Arc::new(Config::load_config(dir)?),
        None => gdmconfig::get_config(),
    };
    logging::init_logging(&config);
    info!("Using configuration in {}", config.directory());

    let app = App::open(config).await?;

    match args.command {
        Command::Remote => app.remote().await,
        Command::Import { replace, search } => app.import(replace, search.as_deref()).await,
        Command::List { search } => app.list(search.as_deref()).await,
        Command::Remove { id } => app.remove(&id).await,
        Command::Move { target, before } => app.move_track(&target, before.as_deref()).await,
        Command::Cache { ids } => app.cache(ids).await,
        Command::Play {
            id,
            next,
            prev,
            output,
        } => {
            let direction = match (next, prev) {
                (true, _) => Some(Direction::Next),
                (_, true) => Some(Direction::Prev),
                _ => None,
            };
            app.play(id.as_deref(), direction, output.as_deref()).await
        }
    }
}
