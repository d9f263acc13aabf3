//! Error types for building and running a mix.

use std::path::PathBuf;

/// Failures of the stitching path: planning a mix and driving the media tools.
#[derive(Debug, thiserror::Error)]
pub enum MixError {
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("Crossfade of {fade}s leaves no room after clip '{title}' ({duration}s long, {silence}s silence)")]
    FadeExceedsClip {
        title: String,
        fade: f64,
        silence: f64,
        duration: f64,
    },

    #[error("{tool} not found in PATH")]
    MissingTool { tool: String },

    #[error("{tool} exited with status {status:?}: {stderr}")]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Output file was not created: {path}")]
    OutputMissing { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type MixResult<T> = Result<T, MixError>;

impl MixError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    pub fn missing_tool(tool: impl Into<String>) -> Self {
        Self::MissingTool { tool: tool.into() }
    }
}
