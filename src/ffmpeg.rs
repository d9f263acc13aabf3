use crate::error::{MixError, MixResult};
use crate::{logi, logw};
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

const PROGRESS_STEP_PERCENT: f64 = 5.0;

fn spawn_error(tool: &str, err: std::io::Error) -> MixError {
    if err.kind() == ErrorKind::NotFound {
        MixError::missing_tool(tool)
    } else {
        MixError::Io(err)
    }
}

pub async fn tool_available(tool: &str) -> bool {
    match Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

pub async fn require_tool(tool: &str) -> MixResult<()> {
    if tool_available(tool).await {
        Ok(())
    } else {
        Err(MixError::missing_tool(tool))
    }
}

/// Runs `tool` to completion with captured output. A non-zero exit carries
/// the tool's stderr verbatim.
pub async fn run_tool(tool: &str, args: &[String]) -> MixResult<Output> {
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| spawn_error(tool, e))?;

    if !output.status.success() {
        return Err(MixError::ExternalTool {
            tool: tool.to_string(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output)
}

pub async fn ffprobe_duration_seconds(path: &Path) -> MixResult<f64> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.display().to_string(),
    ];
    let output = run_tool(FFPROBE, &args).await?;

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_duration(&text).ok_or_else(|| {
        MixError::input(format!(
            "could not read duration of {} (ffprobe said {:?})",
            path.display(),
            text
        ))
    })
}

/// Zero is a valid length; the timeline decides whether such a clip fits.
fn parse_duration(text: &str) -> Option<f64> {
    let duration = text.parse::<f64>().ok()?;
    (duration.is_finite() && duration >= 0.0).then_some(duration)
}

/// Percentage of `total` covered by an `out_time_ms=` line of `-progress` output.
/// Despite the name, ffmpeg reports that value in microseconds.
fn parse_progress_line(line: &str, total: f64) -> Option<f64> {
    let value = line.trim().strip_prefix("out_time_ms=")?;
    let micros = value.parse::<i64>().ok()?;
    if total <= 0.0 {
        return None;
    }
    let seconds = micros as f64 / 1_000_000.0;
    Some((seconds / total * 100.0).clamp(0.0, 100.0))
}

fn format_clock(seconds: f64) -> String {
    let s = seconds.max(0.0) as u64;
    format!("{}:{:02}", s / 60, s % 60)
}

async fn log_progress<R>(reader: R, total: f64) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut last_logged = 0.0;
    while let Some(line) = lines.next_line().await? {
        let Some(progress) = parse_progress_line(&line, total) else {
            continue;
        };
        if progress - last_logged >= PROGRESS_STEP_PERCENT || (progress >= 99.0 && last_logged < 99.0) {
            logi(format!(
                "Render progress: {:.1}% ({}/{})",
                progress,
                format_clock(total * progress / 100.0),
                format_clock(total)
            ));
            last_logged = progress;
        }
    }
    Ok(())
}

/// Follows a running render to exit. A broken progress pipe kills the child
/// before the error is returned.
async fn watch_render(mut child: Child, total: f64) -> MixResult<(ExitStatus, String)> {
    // Drain stderr concurrently or a full pipe stalls ffmpeg.
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        })
    });

    let progress = match child.stdout.take() {
        Some(stdout) => log_progress(BufReader::new(stdout), total).await,
        None => Ok(()),
    };
    if let Err(err) = progress {
        logw(format!("Lost ffmpeg progress output: {}", err));
        let _ = child.kill().await;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }
        return Err(MixError::Io(err));
    }

    let status = child.wait().await?;
    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    Ok((status, stderr))
}

/// Loops a still image under `audio`, logging progress every few percent.
pub async fn render_still_video(
    image: &Path,
    audio: &Path,
    out_mp4: &Path,
    audio_duration: Option<f64>,
) -> MixResult<()> {
    let args = vec![
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        image.display().to_string(),
        "-i".to_string(),
        audio.display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-vf".to_string(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-shortest".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-y".to_string(),
        out_mp4.display().to_string(),
    ];

    let child = Command::new(FFMPEG)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(FFMPEG, e))?;

    let (status, stderr) = watch_render(child, audio_duration.unwrap_or(0.0)).await?;

    if !status.success() {
        logw(format!("ffmpeg video render failed ({})", status));
        return Err(MixError::ExternalTool {
            tool: FFMPEG.to_string(),
            status: status.code(),
            stderr,
        });
    }

    if !out_mp4.exists() {
        return Err(MixError::OutputMissing {
            path: out_mp4.to_path_buf(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration("183.640000"), Some(183.64));
        assert_eq!(parse_duration("0"), Some(0.0));
        assert_eq!(parse_duration("-1.5"), None);
        assert_eq!(parse_duration("N/A"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn progress_lines() {
        assert_eq!(parse_progress_line("out_time_ms=30000000", 60.0), Some(50.0));
        assert_eq!(parse_progress_line("out_time_ms=90000000", 60.0), Some(100.0));
        assert_eq!(parse_progress_line("out_time_ms=N/A", 60.0), None);
        assert_eq!(parse_progress_line("frame=12", 60.0), None);
        assert_eq!(parse_progress_line("out_time_ms=1000", 0.0), None);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(754.9), "12:34");
    }

    #[tokio::test]
    async fn progress_reader_reports_broken_stream() {
        let ok: &[u8] = b"frame=1\nout_time_ms=5000000\nprogress=end\n";
        assert!(log_progress(ok, 10.0).await.is_ok());
        let garbled: &[u8] = b"out_time_ms=1000000\n\xff\xfe\n";
        assert!(log_progress(garbled, 10.0).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn broken_progress_pipe_kills_child() {
        let child = Command::new("sh")
            .arg("-c")
            .arg("printf '\\377\\376\\n'; exec sleep 30")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(10), watch_render(child, 30.0))
            .await
            .expect("render watcher hung on a live child");
        assert!(matches!(result, Err(MixError::Io(_))));
    }

    #[tokio::test]
    async fn missing_binary_maps_to_missing_tool() {
        let err = run_tool("definitely-not-a-real-media-tool", &[]).await.unwrap_err();
        assert!(matches!(err, MixError::MissingTool { .. }));
        assert!(!tool_available("definitely-not-a-real-media-tool").await);
    }
}
