//! Turns a timeline into the ffmpeg invocation that renders it.

use crate::error::MixResult;
use crate::filtergraph::{FilterGraph, FilterNode};
use crate::timeline::{Clip, MixSettings, Timeline, TimelineEntry, Tracklist};
use std::path::{Path, PathBuf};

const OUTPUT_LABEL: &str = "out";
const MP3_BITRATE: &str = "320k";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixStrategy {
    /// Single clip, re-encoded as is.
    Passthrough,
    /// Single clip with trailing silence.
    PadSilence,
    /// Intro followed by a single clip.
    Concat,
    /// Pairwise `acrossfade` chain.
    Crossfade,
    /// Every clip delayed to its timeline start, mixed and loudness-normalized.
    DelayedMix,
}

impl MixStrategy {
    pub fn select(clip_count: usize, has_silence: bool, has_intro: bool) -> Self {
        match (clip_count, has_silence, has_intro) {
            (1, _, true) => MixStrategy::Concat,
            (1, true, false) => MixStrategy::PadSilence,
            (1, false, false) | (0, _, _) => MixStrategy::Passthrough,
            (_, false, false) => MixStrategy::Crossfade,
            _ => MixStrategy::DelayedMix,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MixPlan {
    timeline: Timeline,
    strategy: MixStrategy,
    graph: Option<FilterGraph>,
    inputs: Vec<PathBuf>,
    total_duration: f64,
}

impl MixPlan {
    pub fn build(clips: &[Clip], intro: Option<&Clip>, settings: &MixSettings) -> MixResult<Self> {
        let timeline = Timeline::build(clips, intro, settings)?;
        let strategy = MixStrategy::select(clips.len(), settings.has_silence(), intro.is_some());

        let inputs: Vec<PathBuf> = intro
            .into_iter()
            .chain(clips)
            .map(|c| c.path.clone())
            .collect();

        let tracks: Vec<&TimelineEntry> = timeline.tracks().collect();
        let offset = usize::from(intro.is_some());
        let silence = settings.silence_duration;

        let graph = match strategy {
            MixStrategy::Passthrough => None,
            MixStrategy::PadSilence => {
                let mut graph = FilterGraph::new();
                graph.push(
                    FilterNode::new("apad")
                        .input("0")
                        .param("pad_dur", silence)
                        .output(OUTPUT_LABEL),
                );
                Some(graph)
            }
            MixStrategy::Concat => Some(concat_graph(silence)),
            MixStrategy::Crossfade => Some(crossfade_graph(clips.len(), settings.fade_duration)),
            MixStrategy::DelayedMix => Some(delayed_mix_graph(&tracks, offset, silence)),
        };

        let total_duration = total_duration(&timeline, &tracks, strategy, silence);

        Ok(Self {
            timeline,
            strategy,
            graph,
            inputs,
            total_duration,
        })
    }

    pub fn strategy(&self) -> MixStrategy {
        self.strategy
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        self.timeline.entries()
    }

    pub fn tracklist(&self) -> Tracklist<'_> {
        self.timeline.tracklist()
    }

    pub fn filter_graph(&self) -> Option<&FilterGraph> {
        self.graph.as_ref()
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    /// Expected length of the rendered mix in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Arguments for `ffmpeg` (program name excluded).
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.display().to_string());
        }
        if let Some(graph) = &self.graph {
            args.push("-filter_complex".to_string());
            args.push(graph.to_string());
            if let Some(label) = graph.final_output() {
                args.push("-map".to_string());
                args.push(format!("[{label}]"));
            }
        }
        args.extend([
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            MP3_BITRATE.to_string(),
            output.display().to_string(),
        ]);
        args
    }
}

fn concat_graph(silence: f64) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let mut clip_label = "1".to_string();
    if silence > 0.0 {
        graph.push(
            FilterNode::new("apad")
                .input("1")
                .param("pad_dur", silence)
                .output("a1"),
        );
        clip_label = "a1".to_string();
    }
    graph.push(
        FilterNode::new("concat")
            .inputs(["0".to_string(), clip_label])
            .param("n", 2)
            .param("v", 0)
            .param("a", 1)
            .output(OUTPUT_LABEL),
    );
    graph
}

fn crossfade_graph(clip_count: usize, fade: f64) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let mut current = "0".to_string();
    for i in 1..clip_count {
        let next = if i + 1 == clip_count {
            OUTPUT_LABEL.to_string()
        } else {
            format!("cf{i}")
        };
        graph.push(
            FilterNode::new("acrossfade")
                .inputs([current, i.to_string()])
                .param("d", fade)
                .output(next.clone()),
        );
        current = next;
    }
    graph
}

fn delay_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

fn delayed_mix_graph(tracks: &[&TimelineEntry], offset: usize, silence: f64) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let mut mix_inputs = Vec::with_capacity(tracks.len() + offset);

    // The intro sits at input 0 and plays from time 0 untouched.
    if offset == 1 {
        mix_inputs.push("0".to_string());
    }

    for (j, entry) in tracks.iter().enumerate() {
        let input = j + offset;
        let mut label = input.to_string();

        if j == 0 && silence > 0.0 {
            let padded = format!("p{input}");
            graph.push(
                FilterNode::new("apad")
                    .input(label)
                    .param("pad_dur", silence)
                    .output(padded.clone()),
            );
            label = padded;
        }

        let ms = delay_ms(entry.start);
        if ms > 0 {
            let delayed = format!("a{input}");
            graph.push(
                FilterNode::new("adelay")
                    .input(label)
                    .arg(format!("{ms}|{ms}"))
                    .output(delayed.clone()),
            );
            label = delayed;
        }

        mix_inputs.push(label);
    }

    let count = mix_inputs.len();
    graph
        .push(
            FilterNode::new("amix")
                .inputs(mix_inputs)
                .param("inputs", count)
                .param("duration", "longest")
                .param("normalize", 0)
                .output("mixed"),
        )
        .push(FilterNode::new("dynaudnorm").input("mixed").output(OUTPUT_LABEL));
    graph
}

fn total_duration(
    timeline: &Timeline,
    tracks: &[&TimelineEntry],
    strategy: MixStrategy,
    silence: f64,
) -> f64 {
    let latest_end = timeline
        .entries()
        .iter()
        .map(TimelineEntry::end)
        .fold(0.0, f64::max);

    match strategy {
        MixStrategy::Passthrough | MixStrategy::Crossfade => latest_end,
        MixStrategy::PadSilence | MixStrategy::Concat => latest_end + silence,
        MixStrategy::DelayedMix => {
            let padded_first = tracks.first().map(|e| e.end() + silence).unwrap_or(0.0);
            latest_end.max(padded_first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MixError;

    fn clips(durations: &[f64]) -> Vec<Clip> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Clip::with_title(format!("songs/{i}.mp3"), *d, format!("Song {i}")))
            .collect()
    }

    fn graph_text(plan: &MixPlan) -> String {
        plan.filter_graph().map(|g| g.to_string()).unwrap_or_default()
    }

    #[test]
    fn strategy_table() {
        use MixStrategy::*;
        assert_eq!(MixStrategy::select(1, false, false), Passthrough);
        assert_eq!(MixStrategy::select(1, true, false), PadSilence);
        assert_eq!(MixStrategy::select(1, false, true), Concat);
        assert_eq!(MixStrategy::select(1, true, true), Concat);
        assert_eq!(MixStrategy::select(2, false, false), Crossfade);
        assert_eq!(MixStrategy::select(5, false, false), Crossfade);
        assert_eq!(MixStrategy::select(2, true, false), DelayedMix);
        assert_eq!(MixStrategy::select(2, false, true), DelayedMix);
        assert_eq!(MixStrategy::select(7, true, true), DelayedMix);
    }

    #[test]
    fn single_clip_without_silence_is_passthrough() {
        let plan = MixPlan::build(&clips(&[180.0]), None, &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(plan.strategy(), MixStrategy::Passthrough);
        assert!(plan.filter_graph().is_none());
        let args = plan.ffmpeg_args(Path::new("out.mp3"));
        assert!(!args.iter().any(|a| a == "-filter_complex"));
        assert_eq!(plan.total_duration(), 180.0);
    }

    #[test]
    fn single_clip_pads_trailing_silence() {
        let plan = MixPlan::build(&clips(&[180.0]), None, &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(graph_text(&plan), "[0]apad=pad_dur=6[out]");
        assert_eq!(plan.total_duration(), 186.0);
    }

    #[test]
    fn single_clip_after_intro_is_concatenated() {
        let intro = Clip::producer_tag("tag.mp3", 4.0);
        let plan = MixPlan::build(&clips(&[60.0]), Some(&intro), &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(graph_text(&plan), "[0][1]concat=n=2:v=0:a=1[out]");

        let plan = MixPlan::build(&clips(&[60.0]), Some(&intro), &MixSettings::new(5.0, 2.5)).unwrap();
        assert_eq!(
            graph_text(&plan),
            "[1]apad=pad_dur=2.5[a1];[0][a1]concat=n=2:v=0:a=1[out]"
        );
        assert_eq!(plan.total_duration(), 66.5);
        assert_eq!(plan.inputs()[0], PathBuf::from("tag.mp3"));
    }

    #[test]
    fn two_clips_single_crossfade_with_exact_duration() {
        let plan = MixPlan::build(&clips(&[100.0, 120.0]), None, &MixSettings::new(3.5, 0.0)).unwrap();
        let graph = plan.filter_graph().unwrap();
        assert_eq!(graph.count_filter("acrossfade"), 1);
        assert_eq!(graph.to_string(), "[0][1]acrossfade=d=3.5[out]");
        assert_eq!(plan.total_duration(), 216.5);
    }

    #[test]
    fn crossfade_chain_for_many_clips() {
        let plan = MixPlan::build(&clips(&[100.0, 120.0, 90.0]), None, &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(
            graph_text(&plan),
            "[0][1]acrossfade=d=5[cf1];[cf1][2]acrossfade=d=5[out]"
        );
        let args = plan.ffmpeg_args(Path::new("mix.mp3"));
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert_eq!(args[map + 1], "[out]");
        assert_eq!(args.last().unwrap(), "mix.mp3");
    }

    #[test]
    fn delayed_mix_matches_timeline() {
        let plan = MixPlan::build(&clips(&[100.0, 120.0, 90.0]), None, &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(plan.strategy(), MixStrategy::DelayedMix);
        assert_eq!(
            graph_text(&plan),
            "[0]apad=pad_dur=6[p0];[1]adelay=101000|101000[a1];[2]adelay=222000|222000[a2];\
             [p0][a1][a2]amix=inputs=3:duration=longest:normalize=0[mixed];[mixed]dynaudnorm[out]"
        );
        assert_eq!(plan.total_duration(), 312.0);
    }

    #[test]
    fn two_clips_with_silence_use_delayed_mix() {
        let plan = MixPlan::build(&clips(&[100.0, 120.0]), None, &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(
            graph_text(&plan),
            "[0]apad=pad_dur=6[p0];[1]adelay=101000|101000[a1];\
             [p0][a1]amix=inputs=2:duration=longest:normalize=0[mixed];[mixed]dynaudnorm[out]"
        );
    }

    #[test]
    fn intro_is_mixed_undelayed_and_shifts_every_clip() {
        let intro = Clip::producer_tag("producer_tags/tag.mp3", 7.25);
        let plan =
            MixPlan::build(&clips(&[100.0, 120.0]), Some(&intro), &MixSettings::new(5.0, 0.0)).unwrap();
        assert_eq!(plan.strategy(), MixStrategy::DelayedMix);
        assert_eq!(
            graph_text(&plan),
            "[1]adelay=7250|7250[a1];[2]adelay=102250|102250[a2];\
             [0][a1][a2]amix=inputs=3:duration=longest:normalize=0[mixed];[mixed]dynaudnorm[out]"
        );

        let args = plan.ffmpeg_args(Path::new("mix.mp3"));
        let inputs: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| *flag == "-i")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(inputs, ["producer_tags/tag.mp3", "songs/0.mp3", "songs/1.mp3"]);
    }

    #[test]
    fn intro_with_silence_pads_first_clip_then_delays() {
        let intro = Clip::producer_tag("producer_tags/tag.mp3", 7.25);
        let plan =
            MixPlan::build(&clips(&[100.0, 120.0]), Some(&intro), &MixSettings::new(5.0, 6.0)).unwrap();
        assert_eq!(plan.strategy(), MixStrategy::DelayedMix);
        assert_eq!(
            graph_text(&plan),
            "[1]apad=pad_dur=6[p1];[p1]adelay=7250|7250[a1];[2]adelay=108250|108250[a2];\
             [0][a1][a2]amix=inputs=3:duration=longest:normalize=0[mixed];[mixed]dynaudnorm[out]"
        );
        let starts: Vec<f64> = plan.entries().iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0.0, 7.25, 108.25]);
        assert_eq!(plan.total_duration(), 228.25);
    }

    #[test]
    fn empty_input_fails_before_planning() {
        let err = MixPlan::build(&[], None, &MixSettings::new(5.0, 6.0)).unwrap_err();
        assert!(matches!(err, MixError::Input { .. }));
    }
}
