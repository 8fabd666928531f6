//! Text perturbation: methods, round-robin variant generation, and the fallback policy.
//!
//! A method reports its result as a [`PerturbOutcome`]. Failures never abort an item:
//! [`resolve`] substitutes a fixed deterministic edit instead.

pub mod keyboard;
pub mod synonym;

use crate::config::{BuildConfig, PerturbConfig, PerturbMethod};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use keyboard::KeyboardTypos;
pub use synonym::SynonymSwap;

/// Result of applying one perturbation method to one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerturbOutcome {
    Perturbed(String),
    Failed { reason: String },
}

/// A text perturbation method.
pub trait Perturber: Send + Sync {
    fn name(&self) -> &str;

    /// Perturb `text`, drawing any randomness from `rng`.
    fn perturb(&self, text: &str, rng: &mut StdRng) -> PerturbOutcome;
}

/// Deterministic edit used when a method fails: first `the` becomes `teh`,
/// or a period is appended when the text has no `the`.
pub fn fallback(text: &str) -> String {
    if text.contains("the") {
        text.replacen("the", "teh", 1)
    } else {
        format!("{text}.")
    }
}

/// Turn an outcome into variant text, applying [`fallback`] on failure.
pub fn resolve(outcome: PerturbOutcome, original: &str) -> String {
    match outcome {
        PerturbOutcome::Perturbed(text) => text,
        PerturbOutcome::Failed { .. } => fallback(original),
    }
}

/// One generated variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub text: String,
    pub method: String,
    pub fell_back: bool,
}

/// Produces the perturbed variants of each base item.
pub struct VariantGenerator {
    methods: Vec<Box<dyn Perturber>>,
    variants_per_sample: usize,
    seed: u64,
}

impl VariantGenerator {
    pub fn new(methods: Vec<Box<dyn Perturber>>, variants_per_sample: usize, seed: u64) -> Self {
        Self {
            methods,
            variants_per_sample,
            seed,
        }
    }

    /// Build the configured methods in configured order.
    pub fn from_config(build: &BuildConfig, perturb: &PerturbConfig) -> Self {
        let methods = build
            .methods
            .iter()
            .map(|method| -> Box<dyn Perturber> {
                match method {
                    PerturbMethod::Keyboard => Box::new(KeyboardTypos::new(
                        perturb.keyboard_word_prob,
                        perturb.keyboard_max_chars,
                    )),
                    PerturbMethod::Synonym => Box::new(SynonymSwap::new(perturb.synonym_word_prob)),
                }
            })
            .collect();
        Self::new(methods, build.variants_per_sample, build.seed)
    }

    pub fn variants_per_sample(&self) -> usize {
        self.variants_per_sample
    }

    /// Generate the variants of the base item at `base_index`.
    ///
    /// Variant `i` uses method `i % methods.len()`. Each variant gets its own RNG seeded
    /// from `(seed, base_index, i)`, so a variant does not depend on its siblings.
    pub fn generate(&self, base_index: usize, text: &str) -> Vec<Variant> {
        (0..self.variants_per_sample)
            .map(|i| {
                let Some(method) = self.methods.get(i % self.methods.len().max(1)) else {
                    return Variant {
                        text: fallback(text),
                        method: "fallback".to_string(),
                        fell_back: true,
                    };
                };
                let mut rng = StdRng::seed_from_u64(variant_seed(self.seed, base_index, i));
                let outcome = method.perturb(text, &mut rng);
                let fell_back = matches!(outcome, PerturbOutcome::Failed { .. });
                if let PerturbOutcome::Failed { reason } = &outcome {
                    warn!(
                        method = method.name(),
                        base_index,
                        variant = i + 1,
                        %reason,
                        "Perturbation failed, using fallback"
                    );
                }
                Variant {
                    text: resolve(outcome, text),
                    method: method.name().to_string(),
                    fell_back,
                }
            })
            .collect()
    }
}

fn variant_seed(seed: u64, base_index: usize, variant_index: usize) -> u64 {
    seed.wrapping_add((base_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((variant_index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9))
}

/// Byte ranges of alphabetic words in `text`.
pub(crate) fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_alphabetic(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Pick each candidate with probability `prob`, guaranteeing at least one pick.
pub(crate) fn choose_at_least_one(count: usize, prob: f64, rng: &mut StdRng) -> Vec<usize> {
    use rand::Rng;
    let mut picked: Vec<usize> = (0..count).filter(|_| rng.gen_bool(prob)).collect();
    if picked.is_empty() && count > 0 {
        picked.push(rng.gen_range(0..count));
    }
    picked
}
