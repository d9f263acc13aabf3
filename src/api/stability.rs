use super::{GenerationRequest, MusicGenerator, clean_track_name, download_timestamp, save_audio};
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, multipart::Form};
use std::path::PathBuf;
use std::time::Duration;

const STABILITY_URL: &str = "https://api.stability.ai/v2beta/audio/stable-audio-2/text-to-audio";
const CLIENT_ID: &str = "lofi-channel-generator";
const CLIENT_VERSION: &str = "1.0.0";

/// The service caps clips at this length.
pub const MAX_DURATION_SECS: u32 = 190;

#[derive(Debug, Clone)]
pub struct StabilitySettings {
    pub model: String,
    pub output_format: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub seed: Option<u64>,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            model: "stable-audio-2".to_string(),
            output_format: "mp3".to_string(),
            steps: 100,
            cfg_scale: 7.0,
            seed: None,
        }
    }
}

impl StabilitySettings {
    /// Rough per-request cost quoted by the service.
    pub fn estimated_credits(&self) -> f64 {
        17.0 + 0.06 * self.steps as f64
    }
}

fn clamp_duration(requested: Option<u32>) -> u32 {
    requested.unwrap_or(MAX_DURATION_SECS).clamp(1, MAX_DURATION_SECS)
}

/// Text fields of the multipart form, in send order.
fn form_fields(prompt: &str, duration: u32, settings: &StabilitySettings) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("prompt", prompt.to_string()),
        ("duration", duration.to_string()),
        ("model", settings.model.clone()),
        ("output_format", settings.output_format.clone()),
        ("steps", settings.steps.to_string()),
        ("cfg_scale", settings.cfg_scale.to_string()),
    ];
    if let Some(seed) = settings.seed {
        fields.push(("seed", seed.to_string()));
    }
    fields
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        400 => format!("invalid parameters: {}", body),
        403 => "content flagged by moderation system".to_string(),
        422 => format!("request rejected: {}", body),
        429 => "rate limit exceeded (150 requests in 10 seconds)".to_string(),
        500 => "internal server error".to_string(),
        other => format!("unexpected status {}: {}", other, body),
    }
}

pub struct StabilityClient {
    client: Client,
    api_key: String,
    url: String,
    songs_dir: PathBuf,
    settings: StabilitySettings,
}

impl StabilityClient {
    pub fn new(api_key: impl Into<String>, songs_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            url: STABILITY_URL.to_string(),
            songs_dir: songs_dir.into(),
            settings: StabilitySettings::default(),
        })
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_settings(mut self, settings: StabilitySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl MusicGenerator for StabilityClient {
    fn name(&self) -> &'static str {
        "Stability"
    }

    async fn generate(&self, req: &GenerationRequest) -> Result<Vec<PathBuf>> {
        let song_name = req
            .song_names
            .first()
            .cloned()
            .unwrap_or_else(|| "stability_track".to_string());
        let duration = clamp_duration(req.duration_secs);

        logi(format!(
            "Stability: generating '{}' ({}s, model {}, steps {}, cfg {}, ~{:.0} credits)",
            song_name,
            duration,
            self.settings.model,
            self.settings.steps,
            self.settings.cfg_scale,
            self.settings.estimated_credits()
        ));

        let form = form_fields(&req.prompt, duration, &self.settings)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("accept", "audio/*")
            .header("stability-client-id", CLIENT_ID)
            .header("stability-client-version", CLIENT_VERSION)
            .multipart(form)
            .send()
            .await
            .context("Stability request failed")?;

        let status = resp.status();
        logi(format!("Stability: response status {}", status.as_u16()));
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            let reason = describe_failure(status, &body);
            logw(format!("Stability: {}", reason));
            anyhow::bail!("Stability generation failed: {}", reason);
        }

        let bytes = resp.bytes().await.context("Stability body read failed")?;
        let file_name = format!(
            "{}_{}.{}",
            clean_track_name(&song_name),
            download_timestamp(),
            self.settings.output_format
        );
        let path = save_audio(&self.songs_dir, &file_name, &bytes).await?;
        logok(format!(
            "Audio saved: {} ({:.2} MB)",
            path.display(),
            bytes.len() as f64 / (1024.0 * 1024.0)
        ));
        Ok(vec![path])
    }
}
