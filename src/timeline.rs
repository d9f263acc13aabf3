use crate::error::{MixError, MixResult};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

pub const PRODUCER_TAG_TITLE: &str = "Producer Tag";

const LOFI_PREFIX: &str = "table_audio_lofi_";
const LOFI_PREFIX_WORDS: &[&str] = &["table", "audio", "lofi"];

/// One measured audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub path: PathBuf,
    pub duration: f64,
    pub title: String,
}

impl Clip {
    /// Title is derived from the file name.
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        let path = path.into();
        let title = extract_song_title(&path);
        Self {
            path,
            duration,
            title,
        }
    }

    pub fn with_title(path: impl Into<PathBuf>, duration: f64, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            duration,
            title: title.into(),
        }
    }

    pub fn producer_tag(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self::with_title(path, duration, PRODUCER_TAG_TITLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub fade_duration: f64,
    pub silence_duration: f64,
}

impl MixSettings {
    pub fn new(fade_duration: f64, silence_duration: f64) -> Self {
        Self {
            fade_duration,
            silence_duration,
        }
    }

    pub fn validate(&self) -> MixResult<()> {
        if !self.fade_duration.is_finite() || self.fade_duration < 0.0 {
            return Err(MixError::input(format!(
                "fade duration must be >= 0, got {}",
                self.fade_duration
            )));
        }
        if !self.silence_duration.is_finite() || self.silence_duration < 0.0 {
            return Err(MixError::input(format!(
                "silence duration must be >= 0, got {}",
                self.silence_duration
            )));
        }
        Ok(())
    }

    pub fn has_silence(&self) -> bool {
        self.silence_duration > 0.0
    }
}

impl Default for MixSettings {
    fn default() -> Self {
        Self::new(5.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Intro,
    /// 1-based position in the tracklist.
    Track(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub kind: EntryKind,
    pub title: String,
    pub start: f64,
    pub duration: f64,
}

impl TimelineEntry {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = format_timestamp(self.start);
        match self.kind {
            EntryKind::Intro => write!(f, "{} - {}", ts, self.title),
            EntryKind::Track(n) => write!(f, "{} - {:02}. {}", ts, n, self.title),
        }
    }
}

/// Start times of every clip in the final mix.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// The intro, if any, starts at 0 and is never faded. Every following clip
    /// starts `duration - fade + silence` after the previous one.
    pub fn build(clips: &[Clip], intro: Option<&Clip>, settings: &MixSettings) -> MixResult<Self> {
        if clips.is_empty() {
            return Err(MixError::input("no audio clips to stitch"));
        }
        settings.validate()?;
        for clip in clips.iter().chain(intro) {
            if !clip.duration.is_finite() || clip.duration < 0.0 {
                return Err(MixError::input(format!(
                    "clip '{}' has invalid duration {}",
                    clip.path.display(),
                    clip.duration
                )));
            }
        }

        if let Some(intro) = intro {
            if intro.duration <= 0.0 {
                return Err(MixError::input(format!(
                    "producer tag '{}' has no length",
                    intro.path.display()
                )));
            }
        }

        // Each clip but the last must push the next start strictly forward.
        if let Some((_, leading)) = clips.split_last() {
            for clip in leading {
                if clip.duration - settings.fade_duration + settings.silence_duration <= 0.0 {
                    return Err(MixError::FadeExceedsClip {
                        title: clip.title.clone(),
                        fade: settings.fade_duration,
                        silence: settings.silence_duration,
                        duration: clip.duration,
                    });
                }
            }
        }

        let mut entries = Vec::with_capacity(clips.len() + 1);
        let mut current_time = 0.0;

        if let Some(intro) = intro {
            entries.push(TimelineEntry {
                kind: EntryKind::Intro,
                title: intro.title.clone(),
                start: 0.0,
                duration: intro.duration,
            });
            current_time = intro.duration;
        }

        for (idx, clip) in clips.iter().enumerate() {
            entries.push(TimelineEntry {
                kind: EntryKind::Track(idx + 1),
                title: clip.title.clone(),
                start: current_time,
                duration: clip.duration,
            });
            current_time += clip.duration - settings.fade_duration + settings.silence_duration;
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn intro(&self) -> Option<&TimelineEntry> {
        self.entries.first().filter(|e| e.kind == EntryKind::Intro)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::Track(_)))
    }

    pub fn tracklist(&self) -> Tracklist<'_> {
        Tracklist { timeline: self }
    }
}

/// Human-readable listing, one line per entry.
pub struct Tracklist<'a> {
    timeline: &'a Timeline,
}

impl fmt::Display for Tracklist<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.timeline.entries() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// `MM:SS`, or `H:MM:SS` from one hour on. Fractions are truncated.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    if total >= 3600 {
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    } else {
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

/// Best-effort title from a generated file name such as
/// `table_audio_lofi_20240101_120000_rainy_cafe.mp3`.
pub fn extract_song_title(path: &Path) -> String {
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    if name.contains(LOFI_PREFIX) {
        let parts: Vec<&str> = name
            .split('_')
            .filter(|part| !part.is_empty())
            .filter(|part| !LOFI_PREFIX_WORDS.contains(part))
            .filter(|part| !part.chars().all(|c| c.is_ascii_digit()))
            .collect();
        if !parts.is_empty() {
            return title_case(&parts.join(" "));
        }
    }

    title_case(&name.replace('_', " "))
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest,
/// so `lo-fi dreams` becomes `Lo-Fi Dreams`.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for c in text.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips(durations: &[f64]) -> Vec<Clip> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Clip::with_title(format!("songs/{i}.mp3"), *d, format!("Song {i}")))
            .collect()
    }

    fn starts(timeline: &Timeline) -> Vec<f64> {
        timeline.tracks().map(|e| e.start).collect()
    }

    #[test]
    fn start_is_running_sum_minus_fades() {
        let durations = [100.0, 120.0, 90.0, 150.0];
        let t = Timeline::build(&clips(&durations), None, &MixSettings::new(5.0, 0.0)).unwrap();
        let got = starts(&t);
        for (i, start) in got.iter().enumerate() {
            let sum: f64 = durations[..i].iter().sum();
            assert_eq!(*start, sum - 5.0 * i as f64);
        }
    }

    #[test]
    fn silence_adds_gap_per_transition() {
        let durations = [100.0, 120.0, 90.0];
        let t = Timeline::build(&clips(&durations), None, &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(starts(&t), vec![0.0, 101.0, 222.0]);
    }

    #[test]
    fn intro_shifts_every_track() {
        let durations = [100.0, 120.0, 90.0];
        let settings = MixSettings::new(5.0, 6.0);
        let plain = Timeline::build(&clips(&durations), None, &settings).unwrap();
        let intro = Clip::producer_tag("producer_tags/tag.mp3", 7.5);
        let tagged = Timeline::build(&clips(&durations), Some(&intro), &settings).unwrap();

        assert!(plain.intro().is_none());
        let first = tagged.intro().unwrap();
        assert_eq!(first.kind, EntryKind::Intro);
        assert_eq!(first.start, 0.0);
        assert_eq!(first.title, "Producer Tag");
        assert_eq!(tagged.entries().len(), durations.len() + 1);

        for (a, b) in starts(&plain).iter().zip(starts(&tagged)) {
            assert_eq!(a + 7.5, b);
        }
    }

    #[test]
    fn empty_clip_list_is_input_error() {
        let intro = Clip::producer_tag("tag.mp3", 3.0);
        for settings in [MixSettings::new(0.0, 0.0), MixSettings::new(5.0, 6.0)] {
            let err = Timeline::build(&[], Some(&intro), &settings).unwrap_err();
            assert!(matches!(err, MixError::Input { .. }));
        }
    }

    #[test]
    fn negative_settings_rejected() {
        let err = Timeline::build(&clips(&[10.0]), None, &MixSettings::new(-1.0, 0.0)).unwrap_err();
        assert!(matches!(err, MixError::Input { .. }));
        let err = Timeline::build(&clips(&[10.0]), None, &MixSettings::new(1.0, f64::NAN)).unwrap_err();
        assert!(matches!(err, MixError::Input { .. }));
    }

    #[test]
    fn fade_longer_than_clip_is_flagged() {
        let err = Timeline::build(&clips(&[3.0, 100.0]), None, &MixSettings::new(5.0, 0.0)).unwrap_err();
        match err {
            MixError::FadeExceedsClip { fade, duration, .. } => {
                assert_eq!(fade, 5.0);
                assert_eq!(duration, 3.0);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The last clip is never faded into anything.
        assert!(Timeline::build(&clips(&[100.0, 3.0]), None, &MixSettings::new(5.0, 0.0)).is_ok());
        assert!(Timeline::build(&clips(&[3.0]), None, &MixSettings::new(5.0, 0.0)).is_ok());
    }

    #[test]
    fn fade_equal_to_clip_would_stack_starts() {
        let err = Timeline::build(&clips(&[5.0, 100.0]), None, &MixSettings::new(5.0, 0.0)).unwrap_err();
        assert!(matches!(err, MixError::FadeExceedsClip { .. }));
        // A hair longer keeps the next start ahead.
        let t = Timeline::build(&clips(&[5.5, 100.0]), None, &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(starts(&t), vec![0.0, 0.5]);
    }

    #[test]
    fn silence_can_cover_a_long_fade() {
        let t = Timeline::build(&clips(&[3.0, 100.0]), None, &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(starts(&t), vec![0.0, 4.0]);
        let err = Timeline::build(&clips(&[3.0, 100.0]), None, &MixSettings::new(5.0, 2.0)).unwrap_err();
        assert!(matches!(err, MixError::FadeExceedsClip { .. }));
    }

    #[test]
    fn starts_strictly_increase() {
        let intro = Clip::producer_tag("tag.mp3", 2.0);
        let t = Timeline::build(
            &clips(&[6.0, 30.0, 5.5, 40.0]),
            Some(&intro),
            &MixSettings::new(5.0, 0.0),
        )
        .unwrap();
        let all: Vec<f64> = t.entries().iter().map(|e| e.start).collect();
        assert!(all.windows(2).all(|w| w[0] < w[1]), "{all:?}");
    }

    #[test]
    fn zero_length_intro_rejected() {
        let intro = Clip::producer_tag("tag.mp3", 0.0);
        let err = Timeline::build(&clips(&[100.0, 90.0]), Some(&intro), &MixSettings::default()).unwrap_err();
        assert!(matches!(err, MixError::Input { .. }));
    }

    #[test]
    fn tracklist_lines() {
        let c = vec![
            Clip::with_title("a.mp3", 100.0, "Rainy Cafe"),
            Clip::with_title("b.mp3", 120.0, "Golden Hour"),
            Clip::with_title("c.mp3", 90.0, "Soft Glow"),
        ];
        let t = Timeline::build(&c, None, &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(
            t.tracklist().to_string(),
            "00:00 - 01. Rainy Cafe\n01:35 - 02. Golden Hour\n03:30 - 03. Soft Glow\n"
        );
    }

    #[test]
    fn tracklist_intro_has_no_number() {
        let c = vec![Clip::with_title("a.mp3", 100.0, "Rainy Cafe")];
        let intro = Clip::producer_tag("tag.mp3", 4.0);
        let t = Timeline::build(&c, Some(&intro), &MixSettings::default()).unwrap();
        assert_eq!(
            t.tracklist().to_string(),
            "00:00 - Producer Tag\n00:04 - 01. Rainy Cafe\n"
        );
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(95.9), "01:35");
        assert_eq!(format_timestamp(3599.0), "59:59");
        assert_eq!(format_timestamp(3600.0), "1:00:00");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
    }

    #[test]
    fn title_from_lofi_prefixed_name() {
        let p = Path::new("songs/table_audio_lofi_20240311_154500_rainy_window_cafe.mp3");
        assert_eq!(extract_song_title(p), "Rainy Window Cafe");
    }

    #[test]
    fn title_from_plain_name() {
        assert_eq!(extract_song_title(Path::new("songs/cozy_MORNING.wav")), "Cozy Morning");
        assert_eq!(extract_song_title(Path::new("Golden Hour.mp3")), "Golden Hour");
    }

    #[test]
    fn title_capitalises_after_any_non_letter() {
        assert_eq!(extract_song_title(Path::new("songs/lo-fi_dreams.mp3")), "Lo-Fi Dreams");
        assert_eq!(extract_song_title(Path::new("rainy_day's_END.mp3")), "Rainy Day'S End");
        assert_eq!(extract_song_title(Path::new("2am_vibes.mp3")), "2Am Vibes");
    }
}
