//! Lexical organ scoring: each organ listens for its own cue words.
//!
//! Every cue maps to the atom the organ reports, in that organ's own
//! vocabulary ("feel" for EMPATHY, "sense" for PRESENCE). Reconciling those
//! vocabularies is the synonym normalizer's job, not the lexicon's.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::organ::{ActivationMap, Organ, OrganResult, OrganResults};
use crate::source::{ActivationSource, CycleContext};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static EDGE_QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// Lowercase word tokens. Inner apostrophes survive ("can't").
pub fn tokenize(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(text, " ")
        .to_lowercase()
        .split_whitespace()
        .map(|t| EDGE_QUOTES.replace_all(t, "").into_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Saturating activation for `matches` independent cue hits.
pub fn saturating_activation(matches: usize) -> f64 {
    1.0 - 0.5f64.powi(matches.min(64) as i32)
}

/// Organ name → (cue word → reported atom).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lexicon(BTreeMap<String, BTreeMap<String, String>>);

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cues(&mut self, organ: &str, atom: &str, cues: &[&str]) {
        let entry = self.0.entry(organ.to_string()).or_default();
        for cue in cues {
            entry.insert(cue.to_lowercase(), atom.to_string());
        }
    }

    pub fn organs(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn cue_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    /// Score `text` with every organ. Organs with no matching cue still
    /// appear, with zero coherence and no activations.
    pub fn score(&self, text: &str) -> OrganResults {
        let tokens = tokenize(text);
        let mut results = OrganResults::default();

        for (organ, cues) in &self.0 {
            let mut hits: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                if let Some(atom) = cues.get(token) {
                    *hits.entry(atom.clone()).or_default() += 1;
                }
            }
            let activations: HashMap<String, f64> = hits
                .into_iter()
                .map(|(atom, n)| (atom, saturating_activation(n)))
                .collect();
            let coherence = if activations.is_empty() {
                0.0
            } else {
                activations.values().sum::<f64>() / activations.len() as f64
            };
            results.insert(organ.clone(), OrganResult::new(coherence, activations));
        }
        results
    }
}

/// Activations derived once from a text and replayed on every cycle.
#[derive(Debug, Clone)]
pub struct LexicalActivationSource {
    results: OrganResults,
    maps: ActivationMap,
}

impl LexicalActivationSource {
    pub fn new(lexicon: &Lexicon, text: &str) -> Self {
        let results = lexicon.score(text);
        let maps = results.clone().into_activation_map();
        Self { results, maps }
    }

    pub fn results(&self) -> &OrganResults {
        &self.results
    }

    /// Organs that matched at least one cue.
    pub fn active_organs(&self) -> Vec<&str> {
        self.maps
            .iter()
            .filter(|(_, atoms)| !atoms.is_empty())
            .map(|(organ, _)| organ.as_str())
            .collect()
    }
}

impl ActivationSource for LexicalActivationSource {
    fn activations(&mut self, _ctx: &CycleContext<'_>) -> Result<ActivationMap> {
        Ok(self.maps.clone())
    }
}

/// Cue table for the default organ roster.
pub fn default_lexicon() -> Lexicon {
    let mut lx = Lexicon::new();
    let mut add = |organ: Organ, atom: &str, cues: &[&str]| lx.add_cues(organ.as_str(), atom, cues);

    add(Organ::Listening, "sense", &["hear", "heard", "listen", "listening", "notice"]);
    add(Organ::Listening, "more", &["more", "tell", "else", "deeper"]);
    add(Organ::Listening, "truth", &["mean", "meant", "saying"]);

    add(Organ::Empathy, "feel", &["feel", "feels", "feeling", "felt"]);
    add(Organ::Empathy, "overwhelmed", &["overwhelmed", "flooded", "drowning"]);
    add(Organ::Empathy, "grief", &["sad", "grief", "loss", "hurt", "pain"]);
    add(Organ::Empathy, "belonging", &["alone", "lonely", "isolated"]);

    add(Organ::Wisdom, "pattern", &["pattern", "again", "always", "keeps", "every"]);
    add(Organ::Wisdom, "sense", &["understand", "sense", "makes"]);
    add(Organ::Wisdom, "truth", &["why", "meaning", "lesson"]);

    add(Organ::Authenticity, "honest", &["honest", "honestly", "truth", "true", "real"]);
    add(Organ::Authenticity, "felt", &["feel", "felt"]);

    add(Organ::Presence, "present_moment", &["now", "here", "present", "breathe", "moment"]);
    add(Organ::Presence, "sense", &["body", "chest", "sense", "sensing"]);

    add(Organ::Bond, "together", &["together", "friend", "partner", "family", "relationship"]);
    add(Organ::Bond, "attachment", &["alone", "lonely", "miss", "trust"]);

    add(Organ::Sans, "safe", &["safe", "unsafe", "scared", "afraid", "threat"]);
    add(Organ::Sans, "too_much", &["overwhelmed", "panic", "much"]);

    add(Organ::Ndam, "urgency", &["urgent", "crisis", "emergency", "immediately"]);
    add(Organ::Ndam, "flooded", &["overwhelmed", "panic", "can't"]);
    add(Organ::Ndam, "security", &["scared", "afraid", "help"]);

    add(Organ::Rnx, "recurring_pattern", &["again", "always", "cycle", "repeat", "keeps"]);
    add(Organ::Rnx, "rhythm", &["slow", "pace", "time", "fast"]);

    add(Organ::Eo, "shutdown", &["numb", "tired", "frozen", "shut"]);
    add(Organ::Eo, "protection", &["calm", "safe", "settle"]);
    add(Organ::Eo, "sense", &["heart", "gut"]);

    add(Organ::Card, "expand", &["more", "next", "further", "grow"]);
    add(Organ::Card, "scale", &["enough", "balance", "little", "big"]);

    lx
}
