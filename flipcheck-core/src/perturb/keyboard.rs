//! Keyboard-distance typo injection.

use super::{PerturbOutcome, Perturber, choose_at_least_one, word_spans};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};

/// QWERTY neighbours of each lowercase letter.
static NEIGHBOURS: &[(char, &str)] = &[
    ('a', "qwsz"),
    ('b', "vghn"),
    ('c', "xdfv"),
    ('d', "serfcx"),
    ('e', "wsdr"),
    ('f', "drtgvc"),
    ('g', "ftyhbv"),
    ('h', "gyujnb"),
    ('i', "ujko"),
    ('j', "huikmn"),
    ('k', "jiolm"),
    ('l', "kop"),
    ('m', "njk"),
    ('n', "bhjm"),
    ('o', "iklp"),
    ('p', "ol"),
    ('q', "wa"),
    ('r', "edft"),
    ('s', "awedxz"),
    ('t', "rfgy"),
    ('u', "yhji"),
    ('v', "cfgb"),
    ('w', "qase"),
    ('x', "zsdc"),
    ('y', "tghu"),
    ('z', "asx"),
];

fn neighbour(ch: char, rng: &mut StdRng) -> Option<char> {
    let lower = ch.to_ascii_lowercase();
    let (_, keys) = NEIGHBOURS.iter().find(|(k, _)| *k == lower)?;
    let picked = keys.chars().choose(rng)?;
    Some(if ch.is_ascii_uppercase() {
        picked.to_ascii_uppercase()
    } else {
        picked
    })
}

/// Replaces characters in randomly chosen words with adjacent keyboard keys.
pub struct KeyboardTypos {
    /// Probability that an eligible word is selected.
    pub word_prob: f64,
    /// Upper bound on characters replaced within one word.
    pub max_chars: usize,
}

impl KeyboardTypos {
    pub fn new(word_prob: f64, max_chars: usize) -> Self {
        Self {
            word_prob,
            max_chars,
        }
    }
}

impl Perturber for KeyboardTypos {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn perturb(&self, text: &str, rng: &mut StdRng) -> PerturbOutcome {
        if self.max_chars == 0 {
            return PerturbOutcome::Failed {
                reason: "max_chars is 0".into(),
            };
        }

        // Words of two or more ASCII letters; single letters and non-ASCII words are left alone.
        let eligible: Vec<(usize, usize)> = word_spans(text)
            .into_iter()
            .filter(|&(s, e)| e - s >= 2 && text[s..e].chars().all(|c| c.is_ascii_alphabetic()))
            .collect();
        if eligible.is_empty() {
            return PerturbOutcome::Failed {
                reason: "no word eligible for typos".into(),
            };
        }

        let mut chars: Vec<char> = text.chars().collect();
        // ASCII-only words, so byte offsets inside them map 1:1 to char offsets
        // once shifted by the char index of the word start.
        let char_start = |byte: usize| text[..byte].chars().count();

        for pick in choose_at_least_one(eligible.len(), self.word_prob, rng) {
            let (s, e) = eligible[pick];
            let start = char_start(s);
            let len = e - s;
            let n = rng.gen_range(1..=self.max_chars.min(len));
            let mut positions: Vec<usize> = (0..len).collect();
            positions.shuffle(rng);
            for offset in positions.into_iter().take(n) {
                if let Some(replacement) = neighbour(chars[start + offset], rng) {
                    chars[start + offset] = replacement;
                }
            }
        }

        PerturbOutcome::Perturbed(chars.into_iter().collect())
    }
}
