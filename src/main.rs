//! lofi-mix: builds lofi playlist mixes, videos and descriptions.
//!
//! Usage:
//!   lofi-mix stitch --title <TITLE>   Crossfade a folder of songs into one mix
//!   lofi-mix render <AUDIO>           Turn a mix into a still-image video
//!   lofi-mix describe <TRACKLIST>     Build a video description
//!   lofi-mix rename <INDEX>           Rename songs after a playlist
//!   lofi-mix titles                   Print generated song titles
//!   lofi-mix generate <BACKEND>       Generate songs with an AI service
//!   lofi-mix run <INDEX>              Full pipeline for one playlist
//!   lofi-mix check                    Check ffmpeg/ffprobe availability

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, info, warn};

use lofi_mix::config::{CONFIG_FILE, Config};
use lofi_mix::description::{generate_description_from_file, write_description};
use lofi_mix::pipeline::{self, Backend};
use lofi_mix::playlist::PlaylistList;
use lofi_mix::stitcher::{StitchRequest, stitch_audio_files};
use lofi_mix::titles::TitleGenerator;
use lofi_mix::video::{RenderRequest, convert_audio_to_video};
use lofi_mix::{MixSettings, init, rename};

#[derive(Parser)]
#[command(
    name = "lofi-mix",
    about = "Lofi playlist mixer: crossfades, producer tag, tracklists and videos",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Musicgpt,
    Stability,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Musicgpt => Backend::MusicGpt,
            BackendArg::Stability => Backend::Stability,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stitch every song in a folder into one mix with a tracklist
    Stitch {
        /// Playlist title, used for the output file name
        #[arg(short, long)]
        title: String,

        /// Folder of songs (defaults to songs_dir from the config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output mp3 path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Crossfade length in seconds
        #[arg(long)]
        fade: Option<f64>,

        /// Silence after each track in seconds
        #[arg(long)]
        silence: Option<f64>,

        /// Producer tag to play before the first track
        #[arg(long)]
        intro: Option<PathBuf>,

        /// Skip the configured producer tag
        #[arg(long, conflicts_with = "intro")]
        no_intro: bool,
    },

    /// Render an mp3 into an mp4 with a still image
    Render {
        /// Audio file
        audio: PathBuf,

        /// Image (defaults to a match in thumbnails_dir)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Output mp4 path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a description from a tracklist file
    Describe {
        /// Tracklist written by `stitch`
        tracklist: PathBuf,

        /// Opening paragraph
        #[arg(short, long, conflicts_with = "playlist")]
        description: Option<String>,

        /// Take the opening paragraph from this playlist entry
        #[arg(short, long)]
        playlist: Option<usize>,

        /// Write `<stem>_description.txt` next to this video instead of printing
        #[arg(long)]
        video: Option<PathBuf>,
    },

    /// Rename the songs folder after a playlist's song names
    Rename {
        /// Playlist index in playlist_data
        index: usize,

        /// Folder of songs (defaults to songs_dir from the config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Print unique song titles
    Titles {
        /// How many titles to print
        #[arg(short = 'n', long, default_value = "30")]
        count: usize,

        /// Seed for repeatable output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Generate songs for a playlist with an AI backend
    Generate {
        #[arg(value_enum)]
        backend: BackendArg,

        /// Playlist index in playlist_data
        index: usize,

        /// Override the default prompt
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Generate (optional), rename, stitch, render and describe one playlist
    Run {
        /// Playlist index in playlist_data
        index: usize,

        /// Generate songs first with this backend
        #[arg(long, value_enum)]
        generate: Option<BackendArg>,
    },

    /// Check that ffmpeg and ffprobe are installed
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let cfg = Config::load_or_default(&cli.config).await?;
    init::ensure_directories(&cfg).await?;

    match cli.command {
        Commands::Stitch {
            title,
            input,
            output,
            fade,
            silence,
            intro,
            no_intro,
        } => {
            let intro = match (intro, no_intro) {
                (_, true) => None,
                (Some(path), false) => Some(path),
                (None, false) => pipeline::configured_producer_tag(&cfg).await,
            };
            let req = StitchRequest {
                playlist_title: title,
                input_dir: input.unwrap_or_else(|| cfg.songs_dir.clone()),
                output,
                playlists_dir: cfg.playlists_dir.clone(),
                settings: MixSettings::new(
                    fade.unwrap_or(cfg.fade_duration),
                    silence.unwrap_or(cfg.silence_duration),
                ),
                intro,
            };
            let out = stitch_audio_files(&req).await?;
            info!("Mix: {}", out.mix_path.display());
            info!("Tracklist: {}", out.tracklist_path.display());
        }
        Commands::Render {
            audio,
            image,
            output,
        } => {
            let video = convert_audio_to_video(&RenderRequest {
                audio,
                image,
                output,
                thumbnails_dir: cfg.thumbnails_dir.clone(),
                videos_dir: cfg.videos_dir.clone(),
            })
            .await?;
            info!("Video: {}", video.display());
        }
        Commands::Describe {
            tracklist,
            description,
            playlist,
            video,
        } => {
            let intro = match (description, playlist) {
                (Some(text), _) => text,
                (None, Some(index)) => {
                    let list = PlaylistList::load(&cfg.playlist_data).await?;
                    list.get(index)?.description.clone()
                }
                (None, None) => String::new(),
            };
            let text = generate_description_from_file(&intro, &tracklist, &cfg).await?;
            match video {
                Some(video) => {
                    let path = write_description(&video, &text).await?;
                    info!("Description saved to: {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Commands::Rename { index, dir } => {
            let list = PlaylistList::load(&cfg.playlist_data).await?;
            let playlist = list.get(index)?;
            let dir = dir.unwrap_or_else(|| cfg.songs_dir.clone());
            let n = rename::rename_songs(&dir, playlist.songs()).await?;
            info!("Renamed {} files", n);
        }
        Commands::Titles { count, seed } => {
            let mut generator = match seed {
                Some(seed) => TitleGenerator::with_seed(seed),
                None => TitleGenerator::new(),
            };
            let titles = generator.unique_titles(count);
            if titles.len() < count {
                warn!("Only {} unique titles available", titles.len());
            }
            for (i, title) in titles.iter().enumerate() {
                println!("{}. {}", i + 1, title);
            }
        }
        Commands::Generate {
            backend,
            index,
            prompt,
        } => {
            let backend = Backend::from(backend);
            let list = PlaylistList::load(&cfg.playlist_data).await?;
            let playlist = list.get(index)?;
            let generator = pipeline::build_generator(&cfg, backend)?;
            let mut rng = StdRng::from_entropy();
            let mut requests = pipeline::generation_requests(backend, playlist.songs(), &mut rng);
            if let Some(prompt) = prompt {
                for req in &mut requests {
                    req.prompt = prompt.clone();
                }
            }
            let files = pipeline::generate_songs(generator.as_ref(), &requests).await;
            info!("Generated {} files into {}", files.len(), cfg.songs_dir.display());
        }
        Commands::Run { index, generate } => {
            let video = pipeline::run_playlist_at(&cfg, index, generate.map(Backend::from)).await?;
            info!("Finished playlist {}: {}", index, video.display());
        }
        Commands::Check => {
            if init::check_media_tools().await {
                info!("ffmpeg and ffprobe found");
            } else {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
