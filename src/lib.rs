use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod description;
pub mod error;
pub mod ffmpeg;
pub mod filtergraph;
pub mod init;
pub mod mix_plan;
pub mod pipeline;
pub mod playlist;
pub mod rename;
pub mod stitcher;
pub mod timeline;
pub mod titles;
pub mod video;

pub use error::{MixError, MixResult};
pub use mix_plan::{MixPlan, MixStrategy};
pub use timeline::{Clip, MixSettings, Timeline, TimelineEntry};

pub(crate) fn logi(message: impl AsRef<str>) {
    info!("{}", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    info!(status = "ok", "{}", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    warn!("{}", message.as_ref());
}
