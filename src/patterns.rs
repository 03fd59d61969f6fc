//! Pattern features extracted from the reference corpus.
//!
//! A bounded sample of stored records acts as a vocabulary source for two
//! overlap features (title patterns, content keywords), and a fixed set of
//! numbering patterns detects shared series position. The sample is passed
//! in explicitly, so scoring is a pure function of (seed, candidate,
//! snapshot) and unit-testable without a live store.
//!
//! An empty or unavailable reference corpus produces empty vocabularies
//! and neutral zero scores, never an error.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::corpus::CorpusRecord;

/// Cap on the content keyword vocabulary.
const MAX_CONTENT_KEYWORDS: usize = 1000;

static DIGIT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Numbering patterns that mark an ordinal position inside a series.
static SERIES_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)part\s*(\d+)",
        r"(?i)episode\s*(\d+)",
        r"(?i)ep\s*(\d+)",
        r"#(\d+)",
        r"(?i)day\s*(\d+)",
        r"\((\d+)\)",
        r"\[(\d+)\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static series pattern"))
    .collect()
});

#[derive(Debug)]
enum TitleToken {
    /// Literal lowercase word from a reference title.
    Word(String),
    /// `NUM_<k>`: some reference title contained a k-digit run.
    DigitRun(usize),
}

/// Vocabulary snapshot learned from a bounded sample of corpus records.
#[derive(Debug, Default)]
pub struct PatternModel {
    title_vocab: Vec<TitleToken>,
    content_keywords: Vec<String>,
}

impl PatternModel {
    pub fn from_records(records: &[CorpusRecord]) -> Self {
        let mut words = Vec::new();
        let mut seen_words = HashSet::new();
        let mut run_lengths = Vec::new();
        let mut seen_runs = HashSet::new();

        for record in records {
            let lowered = record.title.to_lowercase();
            for word in tokens(&lowered, 2) {
                if seen_words.insert(word.to_string()) {
                    words.push(word.to_string());
                }
            }
            for run in DIGIT_RUNS.find_iter(&record.title) {
                let len = run.as_str().len();
                if seen_runs.insert(len) {
                    run_lengths.push(len);
                }
            }
        }

        let mut title_vocab: Vec<TitleToken> = words.into_iter().map(TitleToken::Word).collect();
        title_vocab.extend(run_lengths.into_iter().map(TitleToken::DigitRun));

        let mut content_keywords = Vec::new();
        let mut seen_keywords = HashSet::new();
        'records: for record in records {
            let text = format!("{} {}", record.title, record.description).to_lowercase();
            for word in tokens(&text, 3) {
                if seen_keywords.insert(word.to_string()) {
                    content_keywords.push(word.to_string());
                    if content_keywords.len() >= MAX_CONTENT_KEYWORDS {
                        break 'records;
                    }
                }
            }
        }

        Self {
            title_vocab,
            content_keywords,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title_vocab.is_empty() && self.content_keywords.is_empty()
    }

    /// Overlap ratio of the title-vocabulary subsets the two titles match.
    pub fn title_similarity(&self, a: &str, b: &str) -> f32 {
        overlap_ratio(&self.matched_title_tokens(a), &self.matched_title_tokens(b))
    }

    /// Overlap ratio of the keyword subsets the two items contain.
    pub fn content_similarity(
        &self,
        a_title: &str,
        a_description: &str,
        b_title: &str,
        b_description: &str,
    ) -> f32 {
        overlap_ratio(
            &self.matched_keywords(a_title, a_description),
            &self.matched_keywords(b_title, b_description),
        )
    }

    fn matched_title_tokens(&self, title: &str) -> HashSet<usize> {
        let lowered = title.to_lowercase();
        let max_run = DIGIT_RUNS
            .find_iter(title)
            .map(|m| m.as_str().len())
            .max()
            .unwrap_or(0);

        self.title_vocab
            .iter()
            .enumerate()
            .filter(|(_, token)| match token {
                TitleToken::Word(w) => lowered.contains(w.as_str()),
                TitleToken::DigitRun(k) => max_run >= *k,
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn matched_keywords(&self, title: &str, description: &str) -> HashSet<usize> {
        let text = format!("{title} {description}").to_lowercase();
        self.content_keywords
            .iter()
            .enumerate()
            .filter(|(_, kw)| text.contains(kw.as_str()))
            .map(|(idx, _)| idx)
            .collect()
    }
}

fn overlap_ratio(a: &HashSet<usize>, b: &HashSet<usize>) -> f32 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / larger as f32
}

/// Lowercase word tokens strictly longer than `min_len`.
fn tokens(text: &str, min_len: usize) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(move |w| w.len() > min_len)
}

/// Score shared series numbering between two titles.
///
/// For every pattern both titles match, proximity of the two numbers is
/// rewarded: difference <= 1 adds 0.8, <= 3 adds 0.5, <= 5 adds 0.2.
/// Summed across patterns and capped at 1.0.
pub fn series_indicator_score(a: &str, b: &str) -> f32 {
    let mut score = 0.0f32;

    for pattern in SERIES_PATTERNS.iter() {
        if let (Some(na), Some(nb)) = (first_number(pattern, a), first_number(pattern, b)) {
            score += match na.abs_diff(nb) {
                0..=1 => 0.8,
                2..=3 => 0.5,
                4..=5 => 0.2,
                _ => 0.0,
            };
        }
    }

    score.min(1.0)
}

fn first_number(pattern: &Regex, title: &str) -> Option<u64> {
    pattern
        .captures(title)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(title: &str, description: &str) -> CorpusRecord {
        CorpusRecord {
            video_id: format!("id-{title}"),
            title: title.to_string(),
            description: description.to_string(),
            channel_id: "chan".to_string(),
            published_at: "2024-01-01T00:00:00Z".to_string(),
            embedding: vec![],
            created_at: Utc::now(),
        }
    }

    fn series_model() -> PatternModel {
        PatternModel::from_records(&[
            record("Cooking Challenge Part 1", "trying a new recipe today"),
            record("Cooking Challenge Part 2", "the recipe gets harder"),
            record("Cooking Challenge Part 3", "recipe finale"),
        ])
    }

    #[test]
    fn test_sequential_numbers_score_high() {
        assert!((series_indicator_score("Part 3", "Part 4") - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_close_numbers_score_medium() {
        assert!((series_indicator_score("Episode 2", "Episode 5") - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_near_numbers_score_low() {
        assert!((series_indicator_score("Day 1", "Day 6") - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_distant_numbers_score_zero() {
        assert_eq!(series_indicator_score("Part 3", "Part 9"), 0.0);
    }

    #[test]
    fn test_indicator_case_insensitive() {
        assert!((series_indicator_score("PART 7", "part 8") - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_indicator_hash_and_brackets() {
        assert!((series_indicator_score("vlog #12", "vlog #13") - 0.8).abs() < 1e-6);
        assert!((series_indicator_score("saga [4]", "saga [5]") - 0.8).abs() < 1e-6);
        assert!((series_indicator_score("run (9)", "run (10)") - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_indicator_sum_capped() {
        let a = "Part 2 Episode 2 Day 2";
        let b = "Part 3 Episode 3 Day 3";
        assert_eq!(series_indicator_score(a, b), 1.0);
    }

    #[test]
    fn test_indicator_no_shared_pattern() {
        assert_eq!(series_indicator_score("Part 3", "Episode 4"), 0.0);
        assert_eq!(series_indicator_score("no numbers here", "none here either"), 0.0);
    }

    #[test]
    fn test_title_similarity_same_series() {
        let model = series_model();
        let score = model.title_similarity("Cooking Challenge Part 4", "Cooking Challenge Part 5");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_title_similarity_unrelated() {
        let model = series_model();
        let score = model.title_similarity("Cooking Challenge Part 4", "My morning routine");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_title_similarity_partial_overlap() {
        let model = series_model();
        // "Cooking stream" matches a strict subset of what the full series
        // title matches, so the ratio lands strictly between 0 and 1.
        let score = model.title_similarity("Cooking Challenge Part 4", "Cooking stream");
        assert!(score > 0.0);
        assert!(score < 1.0);
    }

    #[test]
    fn test_digit_run_tokens() {
        let model = PatternModel::from_records(&[record("Top 100 moments", "")]);
        // Both titles carry a 3-digit run; neither contains vocabulary
        // words of the reference title.
        let score = model.title_similarity("best 123 clips", "worst 456 clips");
        assert!(score > 0.0);
    }

    #[test]
    fn test_content_similarity_shared_keywords() {
        let model = series_model();
        let score = model.content_similarity(
            "Part 4",
            "another recipe attempt",
            "Part 5",
            "the recipe goes wrong",
        );
        assert!(score > 0.0);
    }

    #[test]
    fn test_content_similarity_no_shared_keywords() {
        let model = series_model();
        let score = model.content_similarity("a", "woodworking tips", "b", "guitar practice");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_empty_model_is_neutral() {
        let model = PatternModel::from_records(&[]);
        assert!(model.is_empty());
        assert_eq!(model.title_similarity("Part 1", "Part 2"), 0.0);
        assert_eq!(model.content_similarity("a", "b", "c", "d"), 0.0);
    }

    #[test]
    fn test_keyword_vocabulary_capped() {
        let mut records = Vec::new();
        for i in 0..30 {
            let description: String = (0..50)
                .map(|j| format!("keyword{i}word{j}"))
                .collect::<Vec<_>>()
                .join(" ");
            records.push(record(&format!("bulk {i}"), &description));
        }

        let model = PatternModel::from_records(&records);
        assert!(model.content_keywords.len() <= MAX_CONTENT_KEYWORDS);
    }
}
