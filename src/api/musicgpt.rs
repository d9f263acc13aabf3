use super::{GenerationRequest, MusicGenerator, clean_track_name, download_timestamp, save_audio};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::time::Duration;

const MUSICGPT_BASE: &str = "https://api.musicgpt.com/api/public/v1";
const DEFAULT_ETA_SECS: f64 = 180.0;
const TRACKS_PER_JOB: usize = 2;

/// Wait `eta + grace` before the first poll, then poll up to `attempts`
/// times, `delay` apart.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub grace: Duration,
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(20),
            attempts: 5,
            delay: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    task_id: Option<String>,
    eta: Option<f64>,
    conversion_id_1: Option<String>,
    conversion_id_2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Conversion {
    status: Option<String>,
    message: Option<String>,
    conversion_path_1: Option<String>,
    conversion_path_2: Option<String>,
    title_1: Option<String>,
    title_2: Option<String>,
    conversion_duration_1: Option<f64>,
    conversion_duration_2: Option<f64>,
}

impl Conversion {
    fn path(&self, track: usize) -> Option<&str> {
        match track {
            1 => self.conversion_path_1.as_deref(),
            2 => self.conversion_path_2.as_deref(),
            _ => None,
        }
    }

    fn title(&self, track: usize) -> Option<&str> {
        match track {
            1 => self.title_1.as_deref(),
            2 => self.title_2.as_deref(),
            _ => None,
        }
    }

    fn duration(&self, track: usize) -> Option<f64> {
        match track {
            1 => self.conversion_duration_1,
            2 => self.conversion_duration_2,
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    conversion: Conversion,
}

#[derive(Debug, PartialEq)]
enum PollState {
    Completed,
    Failed(String),
    Pending(String),
}

fn poll_state(resp: &TaskResponse) -> PollState {
    let status = resp.conversion.status.as_deref().unwrap_or("unknown");
    if resp.success || status == "COMPLETED" {
        return PollState::Completed;
    }
    if status == "FAILED" {
        let msg = resp
            .conversion
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string());
        return PollState::Failed(msg);
    }
    PollState::Pending(status.to_string())
}

/// Unset fields are left out of the payload entirely.
fn build_payload(req: &GenerationRequest) -> Value {
    let mut payload = Map::new();
    if !req.prompt.is_empty() {
        payload.insert("prompt".to_string(), json!(req.prompt));
    }
    if let Some(style) = req.music_style.as_deref().filter(|s| !s.is_empty()) {
        payload.insert("music_style".to_string(), json!(style));
    }
    if req.instrumental {
        payload.insert("make_instrumental".to_string(), json!(true));
    }
    Value::Object(payload)
}

fn track_title(req: &GenerationRequest, conversion: &Conversion, track: usize) -> String {
    req.song_names
        .get(track - 1)
        .cloned()
        .or_else(|| conversion.title(track).map(str::to_string))
        .unwrap_or_else(|| format!("track_{track}"))
}

fn track_file_name(title: &str, timestamp: &str, track: usize) -> String {
    format!("{}_{}_{}.mp3", clean_track_name(title), timestamp, track)
}

pub struct MusicGptClient {
    client: Client,
    api_key: String,
    base_url: String,
    songs_dir: PathBuf,
    poll: PollPolicy,
}

impl MusicGptClient {
    pub fn new(api_key: impl Into<String>, songs_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: MUSICGPT_BASE.to_string(),
            songs_dir: songs_dir.into(),
            poll: PollPolicy::default(),
        })
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns the task id and ETA in seconds.
    async fn submit(&self, req: &GenerationRequest) -> Result<(String, f64)> {
        let payload = build_payload(req);
        let url = format!("{}/MusicAI", self.base_url);
        logi(format!("MusicGPT: submitting job to {}", url));
        tracing::debug!(%payload, "MusicGPT payload");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("MusicGPT request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::OK => {}
            StatusCode::PAYMENT_REQUIRED => anyhow::bail!("MusicGPT: insufficient credits"),
            StatusCode::INTERNAL_SERVER_ERROR => anyhow::bail!("MusicGPT: internal server error"),
            other => {
                let snippet = raw.chars().take(800).collect::<String>();
                anyhow::bail!("MusicGPT: unexpected HTTP {}: {}", other.as_u16(), snippet);
            }
        }

        let submit: SubmitResponse =
            serde_json::from_str(&raw).context("MusicGPT: unreadable submit response")?;
        if !submit.success {
            anyhow::bail!("MusicGPT: generation refused: {}", raw);
        }
        let task_id = submit
            .task_id
            .filter(|t| !t.is_empty())
            .context("MusicGPT: response had no task_id")?;
        let eta = submit.eta.unwrap_or(DEFAULT_ETA_SECS).max(0.0);

        logok(format!(
            "MusicGPT: job started, task {} (eta {:.0}s, tracks {} / {})",
            task_id,
            eta,
            submit.conversion_id_1.as_deref().unwrap_or("N/A"),
            submit.conversion_id_2.as_deref().unwrap_or("N/A"),
        ));
        Ok((task_id, eta))
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskResponse> {
        let url = format!("{}/byId", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("conversionType", "MUSIC_AI"), ("task_id", task_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("MusicGPT poll request failed")?;

        match resp.status() {
            StatusCode::OK => resp
                .json::<TaskResponse>()
                .await
                .context("MusicGPT: unreadable task response"),
            StatusCode::NOT_FOUND => anyhow::bail!("task {} not found", task_id),
            other => anyhow::bail!("API error: HTTP {}", other.as_u16()),
        }
    }

    async fn poll_for_result(&self, task_id: &str, eta: f64) -> Result<TaskResponse> {
        let initial = Duration::from_secs_f64(eta) + self.poll.grace;
        logi(format!("MusicGPT: waiting {}s before polling", initial.as_secs()));
        tokio::time::sleep(initial).await;

        for attempt in 1..=self.poll.attempts {
            logi(format!(
                "MusicGPT: polling attempt {}/{}",
                attempt, self.poll.attempts
            ));
            match self.fetch_task(task_id).await {
                Ok(resp) => match poll_state(&resp) {
                    PollState::Completed => {
                        logok("MusicGPT: task completed");
                        return Ok(resp);
                    }
                    PollState::Failed(msg) => anyhow::bail!("MusicGPT task failed: {}", msg),
                    PollState::Pending(status) => {
                        logi(format!("MusicGPT: still processing (status {})", status));
                    }
                },
                Err(err) => logw(format!("MusicGPT polling error: {:#}", err)),
            }

            if attempt < self.poll.attempts {
                tokio::time::sleep(self.poll.delay).await;
            }
        }

        anyhow::bail!("MusicGPT: task {} did not complete within polling window", task_id)
    }

    async fn download(&self, url: &str, file_name: &str) -> Result<PathBuf> {
        logi(format!("Downloading {} from {}", file_name, url));
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("download failed: {}", url))?
            .bytes()
            .await
            .context("download body read failed")?;
        let path = save_audio(&self.songs_dir, file_name, &bytes).await?;
        logok(format!(
            "Downloaded: {} ({:.2} MB)",
            path.display(),
            bytes.len() as f64 / (1024.0 * 1024.0)
        ));
        Ok(path)
    }
}

#[async_trait]
impl MusicGenerator for MusicGptClient {
    fn name(&self) -> &'static str {
        "MusicGPT"
    }

    fn tracks_per_job(&self) -> usize {
        TRACKS_PER_JOB
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<Vec<PathBuf>> {
        let (task_id, eta) = self.submit(req).await?;
        let result = self.poll_for_result(&task_id, eta).await?;

        let timestamp = download_timestamp();
        let mut files = Vec::new();
        for track in 1..=TRACKS_PER_JOB {
            let Some(url) = result.conversion.path(track) else {
                continue;
            };
            let title = track_title(req, &result.conversion, track);
            if let Some(d) = result.conversion.duration(track) {
                logi(format!("Track {} '{}' is {:.1}s", track, title, d));
            }
            match self.download(url, &track_file_name(&title, &timestamp, track)).await {
                Ok(path) => files.push(path),
                Err(err) => logw(format!("Download error for {}: {:#}", title, err)),
            }
        }
        Ok(files)
    }
}
