//! Static-image video from a finished mix.

use crate::error::{MixError, MixResult};
use crate::ffmpeg::{self, FFMPEG};
use crate::{logi, logok, logw};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|i| i.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Prefers `<thumbnails>/<audio stem>.<ext>`, else the first image by name.
pub fn find_thumbnail(thumbnails_dir: &Path, audio: &Path) -> Option<PathBuf> {
    if !thumbnails_dir.is_dir() {
        return None;
    }

    if let Some(stem) = audio.file_stem().and_then(OsStr::to_str) {
        for ext in IMAGE_EXTENSIONS {
            let candidate = thumbnails_dir.join(format!("{stem}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    let mut images: Vec<PathBuf> = WalkDir::new(thumbnails_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && has_image_extension(e.path()))
        .map(|e| e.into_path())
        .collect();
    images.sort();
    images.into_iter().next()
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub audio: PathBuf,
    pub image: Option<PathBuf>,
    /// Defaults to `<videos_dir>/<audio stem>.mp4`.
    pub output: Option<PathBuf>,
    pub thumbnails_dir: PathBuf,
    pub videos_dir: PathBuf,
}

pub async fn convert_audio_to_video(req: &RenderRequest) -> MixResult<PathBuf> {
    if fs::metadata(&req.audio).await.is_err() {
        return Err(MixError::input(format!(
            "audio file not found: {}",
            req.audio.display()
        )));
    }

    let image = match &req.image {
        Some(image) => image.clone(),
        None => {
            let found = find_thumbnail(&req.thumbnails_dir, &req.audio).ok_or_else(|| {
                MixError::input(format!(
                    "no image found in {}",
                    req.thumbnails_dir.display()
                ))
            })?;
            logi(format!("Using image: {}", found.display()));
            found
        }
    };
    if fs::metadata(&image).await.is_err() {
        return Err(MixError::input(format!(
            "image file not found: {}",
            image.display()
        )));
    }

    let output = match &req.output {
        Some(path) => path.clone(),
        None => {
            let stem = req
                .audio
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("video");
            req.videos_dir.join(format!("{stem}.mp4"))
        }
    };
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    ffmpeg::require_tool(FFMPEG).await?;

    let duration = match ffmpeg::ffprobe_duration_seconds(&req.audio).await {
        Ok(d) => {
            logi(format!(
                "Audio duration: {}m {}s",
                (d / 60.0) as u64,
                (d % 60.0) as u64
            ));
            Some(d)
        }
        Err(err) => {
            logw(format!("Could not determine audio duration: {}", err));
            None
        }
    };

    logi(format!(
        "Creating video: audio={} image={} output={}",
        req.audio.display(),
        image.display(),
        output.display()
    ));
    ffmpeg::render_still_video(&image, &req.audio, &output, duration).await?;
    logok(format!("Video created: {}", output.display()));
    Ok(output)
}
