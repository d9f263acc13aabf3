//! Song title generator built from fixed word banks.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

pub static ADJECTIVES: &[&str] = &[
    "Cozy", "Gentle", "Warm", "Dreamy", "Soft", "Quiet", "Easy", "Calm", "Sunny", "Mellow",
    "Soothing", "Breezy", "Lazy", "Peaceful", "Golden", "Tranquil", "Chill", "Fading", "Hazy",
    "Serene", "Blissful", "Uplifting", "Hopeful", "Bright", "Velvet", "Drowsy", "Faint",
    "Shimmering", "Luminous", "Wistful", "Playful", "Cheerful", "Pastel", "Frosted", "Evening",
    "Morning", "Midnight", "Twilight", "Crimson", "Azure", "Ivory", "Amber",
];

pub static TIME_WORDS: &[&str] = &[
    "Morning", "Noon", "Midnight", "Twilight", "Sunrise", "Sunset", "Dawn", "Dusk", "Nightfall",
    "Daybreak", "Golden Hour", "Evening", "Late Night", "Afternoon", "First Light",
];

pub static NATURE_WORDS: &[&str] = &[
    "Breeze", "Rain", "Sunlight", "Sky", "Clouds", "Mist", "Waves", "Forest", "Leaves", "River",
    "Mountains", "Shore", "Sea", "Valley", "Horizon", "Moonlight", "Starlight", "Fog", "Petals",
    "Snow", "Wind", "Meadow", "Garden", "Ocean", "Stream", "Fields", "Branches",
];

pub static COZY_NOUNS: &[&str] = &[
    "Cafe", "Dream", "Glow", "Haze", "Drift", "Flow", "Rhythm", "Melody", "Harmony", "Serenade",
    "Echo", "Whisper", "Loop", "Groove", "Stroll", "Lounge", "Room", "Corner", "Window", "Light",
    "Steps", "Shadows", "Reflections", "Chapters", "Pages", "Stories", "Letters", "Moments",
    "Frames",
];

pub static PLACES: &[&str] = &[
    "the City", "the Garden", "the Cafe", "the Valley", "the Forest", "the Rain",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    AdjNoun,
    NounOfNature,
    TimeNoun,
    AdjNature,
    NatureAndNoun,
    AdjTime,
    TimeInPlace,
}

const PATTERNS: &[Pattern] = &[
    Pattern::AdjNoun,
    Pattern::NounOfNature,
    Pattern::TimeNoun,
    Pattern::AdjNature,
    Pattern::NatureAndNoun,
    Pattern::AdjTime,
    Pattern::TimeInPlace,
];

/// Upper bound on distinct titles the banks can produce.
pub fn combination_count() -> usize {
    let (a, t, n, c, p) = (
        ADJECTIVES.len(),
        TIME_WORDS.len(),
        NATURE_WORDS.len(),
        COZY_NOUNS.len(),
        PLACES.len(),
    );
    a * c + c * n + t * c + a * n + n * c + a * t + t * p
}

pub struct TitleGenerator {
    rng: StdRng,
}

impl TitleGenerator {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, bank: &[&'static str]) -> &'static str {
        bank.choose(&mut self.rng).copied().unwrap_or_default()
    }

    pub fn title(&mut self) -> String {
        let pattern = PATTERNS[self.rng.gen_range(0..PATTERNS.len())];
        match pattern {
            Pattern::AdjNoun => format!("{} {}", self.pick(ADJECTIVES), self.pick(COZY_NOUNS)),
            Pattern::NounOfNature => {
                format!("{} of {}", self.pick(COZY_NOUNS), self.pick(NATURE_WORDS))
            }
            Pattern::TimeNoun => format!("{} {}", self.pick(TIME_WORDS), self.pick(COZY_NOUNS)),
            Pattern::AdjNature => format!("{} {}", self.pick(ADJECTIVES), self.pick(NATURE_WORDS)),
            Pattern::NatureAndNoun => {
                format!("{} and {}", self.pick(NATURE_WORDS), self.pick(COZY_NOUNS))
            }
            Pattern::AdjTime => format!("{} {}", self.pick(ADJECTIVES), self.pick(TIME_WORDS)),
            Pattern::TimeInPlace => format!("{} in {}", self.pick(TIME_WORDS), self.pick(PLACES)),
        }
    }

    /// Up to `count` distinct titles in generation order. May return fewer
    /// when the banks run dry.
    pub fn unique_titles(&mut self, count: usize) -> Vec<String> {
        let target = count.min(combination_count());
        let mut attempts = target.saturating_mul(50);
        let mut seen = HashSet::with_capacity(target);
        let mut out = Vec::with_capacity(target);
        while out.len() < target && attempts > 0 {
            attempts -= 1;
            let title = self.title();
            if seen.insert(title.clone()) {
                out.push(title);
            }
        }
        out
    }
}

impl Default for TitleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generator_is_deterministic() {
        let a = TitleGenerator::with_seed(7).unique_titles(25);
        let b = TitleGenerator::with_seed(7).unique_titles(25);
        assert_eq!(a, b);
    }

    #[test]
    fn unique_titles_are_distinct() {
        let titles = TitleGenerator::with_seed(42).unique_titles(1000);
        assert_eq!(titles.len(), 1000);
        let set: HashSet<&String> = titles.iter().collect();
        assert_eq!(set.len(), titles.len());
    }

    #[test]
    fn titles_use_bank_words() {
        let mut generator = TitleGenerator::with_seed(1);
        for _ in 0..200 {
            let title = generator.title();
            let known = ADJECTIVES
                .iter()
                .chain(TIME_WORDS)
                .chain(NATURE_WORDS)
                .chain(COZY_NOUNS)
                .any(|w| title.starts_with(w));
            assert!(known, "unexpected title {title}");
        }
    }
}
