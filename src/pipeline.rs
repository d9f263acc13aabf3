//! Playlist run: generate, rename, stitch, render, describe.

use crate::api::{GenerationRequest, MusicGenerator, MusicGptClient, StabilityClient};
use crate::config::Config;
use crate::description::{generate_description_from_file, write_description};
use crate::playlist::{PlaylistData, PlaylistList};
use crate::rename::rename_songs;
use crate::stitcher::{StitchRequest, stitch_audio_files};
use crate::timeline::MixSettings;
use crate::video::{RenderRequest, convert_audio_to_video};
use crate::{logi, logok, logw};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

pub const MUSICGPT_PROMPT: &str = "A slightly upbeat lofi hip hop instrumental with a warm, cozy, and cheerful mood, slow tempo, simple melody, bright but soothing.";

pub const STABILITY_PROMPT: &str = "A slightly upbeat lofi hip hop instrumental at ~88 BPM, with a warm, cozy, and cheerful mood (uplifting yet relaxed). Featuring jazzy piano, soft vinyl crackle, gentle acoustic guitar plucks, mellow laid-back drums with light swing, smooth jazzy bass, and ambient background texture, bright but soothing.";

const MIN_STABILITY_SECS: u32 = 150;
const MAX_STABILITY_SECS: u32 = 190;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MusicGpt,
    Stability,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::MusicGpt => write!(f, "musicgpt"),
            Backend::Stability => write!(f, "stability"),
        }
    }
}

pub fn build_generator(cfg: &Config, backend: Backend) -> Result<Box<dyn MusicGenerator>> {
    let generator: Box<dyn MusicGenerator> = match backend {
        Backend::MusicGpt => Box::new(MusicGptClient::new(cfg.musicgpt_key()?, &cfg.songs_dir)?),
        Backend::Stability => Box::new(StabilityClient::new(cfg.stability_key()?, &cfg.songs_dir)?),
    };
    Ok(generator)
}

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// One request per MusicGPT job (two songs each) or per Stability song.
pub fn generation_requests(backend: Backend, songs: &[String], rng: &mut StdRng) -> Vec<GenerationRequest> {
    match backend {
        Backend::MusicGpt => songs
            .chunks(2)
            .map(|pair| GenerationRequest {
                prompt: MUSICGPT_PROMPT.to_string(),
                music_style: Some("Lofi".to_string()),
                song_names: pair.to_vec(),
                duration_secs: None,
                instrumental: false,
            })
            .collect(),
        Backend::Stability => songs
            .iter()
            .map(|song| GenerationRequest {
                prompt: STABILITY_PROMPT.to_string(),
                music_style: None,
                song_names: vec![song.clone()],
                duration_secs: Some(rng.gen_range(MIN_STABILITY_SECS..=MAX_STABILITY_SECS)),
                instrumental: false,
            })
            .collect(),
    }
}

/// Runs every request in order; failed jobs are logged and skipped.
pub async fn generate_songs(
    generator: &dyn MusicGenerator,
    requests: &[GenerationRequest],
) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for (i, req) in requests.iter().enumerate() {
        logi(format!(
            "{} job {}/{}: {}",
            generator.name(),
            i + 1,
            requests.len(),
            req.song_names.join(", ")
        ));
        match generator.generate(req).await {
            Ok(mut out) => {
                let expected = generator.tracks_per_job().min(req.song_names.len().max(1));
                if out.len() < expected {
                    logw(format!(
                        "{} job {} returned {} of {} tracks",
                        generator.name(),
                        i + 1,
                        out.len(),
                        expected
                    ));
                }
                files.append(&mut out);
            }
            Err(err) => logw(format!("{} job failed: {:#}", generator.name(), err)),
        }
    }
    files
}

/// The configured producer tag, or `None` with a warning when the file is absent.
pub async fn configured_producer_tag(cfg: &Config) -> Option<PathBuf> {
    let path = cfg.producer_tag.clone()?;
    if fs::metadata(&path).await.is_ok() {
        Some(path)
    } else {
        logw(format!(
            "Producer tag {} not found; mixing without intro",
            path.display()
        ));
        None
    }
}

/// Runs the whole chain for one playlist and returns the video path.
pub async fn run_playlist(
    cfg: &Config,
    playlist: &PlaylistData,
    backend: Option<Backend>,
) -> Result<PathBuf> {
    let songs = playlist.songs();
    logi(format!(
        "Playlist '{}' with {} songs",
        playlist.title,
        songs.len()
    ));

    if let Some(backend) = backend {
        let generator = build_generator(cfg, backend)?;
        let mut rng = StdRng::seed_from_u64(now_seed());
        let requests = generation_requests(backend, songs, &mut rng);
        let files = generate_songs(generator.as_ref(), &requests).await;
        logok(format!("Generated {} files with {}", files.len(), backend));
    }

    rename_songs(&cfg.songs_dir, songs).await?;

    let stitched = stitch_audio_files(&StitchRequest {
        playlist_title: playlist.title.clone(),
        input_dir: cfg.songs_dir.clone(),
        output: None,
        playlists_dir: cfg.playlists_dir.clone(),
        settings: MixSettings::new(cfg.fade_duration, cfg.silence_duration),
        intro: configured_producer_tag(cfg).await,
    })
    .await?;
    logok("Audio stitching complete");

    let video = convert_audio_to_video(&RenderRequest {
        audio: stitched.mix_path.clone(),
        image: None,
        output: Some(stitched.mix_path.with_extension("mp4")),
        thumbnails_dir: cfg.thumbnails_dir.clone(),
        videos_dir: cfg.videos_dir.clone(),
    })
    .await?;

    let text =
        generate_description_from_file(&playlist.description, &stitched.tracklist_path, cfg).await?;
    let description = write_description(&video, &text).await?;
    logok(format!("Description saved to: {}", description.display()));

    Ok(video)
}

/// Loads `cfg.playlist_data` and runs the playlist at `index`.
pub async fn run_playlist_at(cfg: &Config, index: usize, backend: Option<Backend>) -> Result<PathBuf> {
    let list = PlaylistList::load(&cfg.playlist_data).await?;
    let playlist = list.get(index)?;
    run_playlist(cfg, playlist, backend).await
}
