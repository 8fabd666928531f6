//! Word-level synonym substitution.

use super::{PerturbOutcome, Perturber, choose_at_least_one, word_spans};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Built-in synonym sets, lower-case. Each word maps to the other members of its set.
static SYNONYM_SETS: &[&[&str]] = &[
    &["film", "movie", "picture"],
    &["story", "tale", "narrative"],
    &["funny", "amusing", "comical"],
    &["actor", "performer", "player"],
    &["director", "filmmaker"],
    &["script", "screenplay"],
    &["big", "large", "huge"],
    &["small", "little"],
    &["fast", "quick", "rapid"],
    &["slow", "sluggish"],
    &["begin", "start"],
    &["end", "finish", "conclusion"],
    &["show", "display", "exhibit"],
    &["make", "create"],
    &["look", "appear", "seem"],
    &["often", "frequently"],
    &["almost", "nearly"],
    &["very", "extremely", "really"],
    &["smart", "clever", "intelligent"],
    &["strange", "odd", "peculiar"],
    &["beautiful", "lovely", "gorgeous"],
    &["boring", "dull", "tedious"],
    &["scary", "frightening", "terrifying"],
    &["sad", "sorrowful", "melancholy"],
    &["happy", "glad", "cheerful"],
    &["work", "piece", "effort"],
    &["audience", "viewers", "spectators"],
    &["character", "role"],
    &["scene", "sequence"],
    &["plot", "storyline"],
    &["moment", "instant"],
    &["feel", "sense"],
    &["life", "existence"],
    &["world", "universe"],
    &["kid", "child"],
    &["mostly", "largely", "chiefly"],
    &["enough", "sufficient"],
    &["simply", "merely", "just"],
];

fn synonym_table() -> HashMap<&'static str, Vec<&'static str>> {
    let mut table: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for set in SYNONYM_SETS {
        for &word in set.iter() {
            let others = set.iter().copied().filter(|w| *w != word);
            table.entry(word).or_default().extend(others);
        }
    }
    table
}

fn match_case(template: &str, word: &str) -> String {
    if template.chars().all(|c| c.is_uppercase()) && template.chars().count() > 1 {
        word.to_uppercase()
    } else if template.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = word.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    } else {
        word.to_string()
    }
}

/// Replaces words that have a known synonym.
pub struct SynonymSwap {
    /// Probability that a word with a known synonym is replaced.
    pub word_prob: f64,
    table: HashMap<&'static str, Vec<&'static str>>,
}

impl SynonymSwap {
    pub fn new(word_prob: f64) -> Self {
        Self {
            word_prob,
            table: synonym_table(),
        }
    }

    fn synonyms(&self, word: &str) -> Option<&[&'static str]> {
        self.table
            .get(word.to_lowercase().as_str())
            .map(Vec::as_slice)
    }
}

impl Perturber for SynonymSwap {
    fn name(&self) -> &str {
        "synonym"
    }

    fn perturb(&self, text: &str, rng: &mut StdRng) -> PerturbOutcome {
        let candidates: Vec<(usize, usize)> = word_spans(text)
            .into_iter()
            .filter(|&(s, e)| self.synonyms(&text[s..e]).is_some())
            .collect();
        if candidates.is_empty() {
            return PerturbOutcome::Failed {
                reason: "no word with a known synonym".into(),
            };
        }

        let mut picked = choose_at_least_one(candidates.len(), self.word_prob, rng);
        picked.sort_unstable();

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for idx in picked {
            let (s, e) = candidates[idx];
            let original = &text[s..e];
            let Some(replacement) = self
                .synonyms(original)
                .and_then(|options| options.choose(&mut *rng))
            else {
                continue;
            };
            out.push_str(&text[cursor..s]);
            out.push_str(&match_case(original, replacement));
            cursor = e;
        }
        out.push_str(&text[cursor..]);

        PerturbOutcome::Perturbed(out)
    }
}
