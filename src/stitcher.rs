//! Stitches every audio file in a folder into one crossfaded mix.

use crate::error::{MixError, MixResult};
use crate::ffmpeg::{self, FFMPEG, FFPROBE};
use crate::mix_plan::MixPlan;
use crate::timeline::{Clip, MixSettings};
use crate::{logi, logok, logw};
use chrono::{DateTime, Local};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "aac"];

#[derive(Debug, Clone)]
pub struct StitchRequest {
    pub playlist_title: String,
    pub input_dir: PathBuf,
    /// Defaults to `<playlists_dir>/<title>_<timestamp>.mp3`.
    pub output: Option<PathBuf>,
    pub playlists_dir: PathBuf,
    pub settings: MixSettings,
    pub intro: Option<PathBuf>,
}

#[derive(Debug)]
pub struct StitchOutput {
    pub mix_path: PathBuf,
    pub tracklist_path: PathBuf,
    pub plan: MixPlan,
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Audio files directly inside `dir`, sorted by path.
pub fn list_audio_files(dir: &Path) -> MixResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && has_audio_extension(entry.path()) {
            out.push(entry.into_path());
        }
    }
    out.sort();
    Ok(out)
}

pub fn default_output_path(playlists_dir: &Path, playlist_title: &str, now: DateTime<Local>) -> PathBuf {
    playlists_dir.join(format!(
        "{}_{}.mp3",
        playlist_title,
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// `<dir>/<stem>_tracklist.txt` next to the mix.
pub fn tracklist_path_for(mix_path: &Path) -> PathBuf {
    let stem = mix_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("mix");
    mix_path.with_file_name(format!("{stem}_tracklist.txt"))
}

pub async fn write_tracklist(plan: &MixPlan, path: &Path) -> MixResult<()> {
    fs::write(path, plan.tracklist().to_string()).await?;
    Ok(())
}

async fn measure(path: &Path) -> MixResult<Clip> {
    let duration = ffmpeg::ffprobe_duration_seconds(path).await?;
    Ok(Clip::new(path, duration))
}

pub async fn stitch_audio_files(req: &StitchRequest) -> MixResult<StitchOutput> {
    if !fs::metadata(&req.input_dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(MixError::input(format!(
            "folder '{}' not found",
            req.input_dir.display()
        )));
    }
    req.settings.validate()?;

    ffmpeg::require_tool(FFMPEG).await?;
    ffmpeg::require_tool(FFPROBE).await?;

    let files = list_audio_files(&req.input_dir)?;
    if files.is_empty() {
        return Err(MixError::input(format!(
            "no audio files found in '{}'",
            req.input_dir.display()
        )));
    }

    let mut clips = Vec::with_capacity(files.len());
    for file in &files {
        clips.push(measure(file).await?);
    }

    let intro = match &req.intro {
        Some(path) => {
            if fs::metadata(path).await.is_err() {
                return Err(MixError::input(format!(
                    "producer tag '{}' not found",
                    path.display()
                )));
            }
            let duration = ffmpeg::ffprobe_duration_seconds(path).await?;
            Some(Clip::producer_tag(path, duration))
        }
        None => None,
    };

    logi(format!("Found {} audio files:", clips.len()));
    for (i, clip) in clips.iter().enumerate() {
        let name = clip
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        logi(format!("  {}. {} ({:.1}s)", i + 1, name, clip.duration));
    }

    let plan = MixPlan::build(&clips, intro.as_ref(), &req.settings)?;

    let mix_path = match &req.output {
        Some(path) => path.clone(),
        None => default_output_path(&req.playlists_dir, &req.playlist_title, Local::now()),
    };
    if let Some(parent) = mix_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    if req.settings.has_silence() {
        logi(format!(
            "Stitching with {}s crossfades and {}s silence gaps ({:?})...",
            req.settings.fade_duration,
            req.settings.silence_duration,
            plan.strategy()
        ));
    } else {
        logi(format!(
            "Stitching with {}s crossfades ({:?})...",
            req.settings.fade_duration,
            plan.strategy()
        ));
    }

    let args = plan.ffmpeg_args(&mix_path);
    if let Some(graph) = plan.filter_graph() {
        tracing::debug!(filter_complex = %graph, "ffmpeg filter graph");
    }
    if let Err(err) = ffmpeg::run_tool(FFMPEG, &args).await {
        logw(format!("FFmpeg failed: {}", err));
        return Err(err);
    }

    let meta = match fs::metadata(&mix_path).await {
        Ok(meta) => meta,
        Err(_) => return Err(MixError::OutputMissing { path: mix_path }),
    };

    let measured = ffmpeg::ffprobe_duration_seconds(&mix_path)
        .await
        .unwrap_or_else(|_| plan.total_duration());
    logok(format!("Created stitched audio: {}", mix_path.display()));
    logi(format!(
        "Total duration: {}m {}s (planned {:.1}s), size {:.2} MB, {} tracks",
        (measured / 60.0).floor(),
        (measured % 60.0).round(),
        plan.total_duration(),
        meta.len() as f64 / (1024.0 * 1024.0),
        clips.len()
    ));

    if let Some(intro) = plan.timeline().intro() {
        logi(format!("Opens with {} ({:.1}s)", intro.title, intro.duration));
    }
    logi("Tracklist with timestamps:");
    for entry in plan.entries() {
        logi(entry.to_string());
    }

    let tracklist_path = tracklist_path_for(&mix_path);
    write_tracklist(&plan, &tracklist_path).await?;
    logok(format!("Tracklist saved to: {}", tracklist_path.display()));

    Ok(StitchOutput {
        mix_path,
        tracklist_path,
        plan,
    })
}
