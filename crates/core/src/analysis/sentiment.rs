//! Lexicon and rule based compound sentiment.
//!
//! Each token's valence comes from a fixed word list (roughly on a -4..4 scale),
//! adjusted by nearby intensifiers, negations, contrastive "but", all-caps
//! emphasis and exclamation marks. The summed valence is squashed into [-1, 1].
//! No I/O and no randomness: identical text always scores identically.

use std::collections::{HashMap, HashSet};

/// Normalization constant: approximates the max expected summed valence.
const ALPHA: f64 = 15.0;

const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCR: f64 = 0.293;
const BOOSTER_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const EXCLAMATION_INCR: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

/// How far back a negation or booster reaches, with per-distance damping.
const LOOKBACK_DAMPING: [f64; 3] = [1.0, 0.95, 0.9];

const LEXICON: &[(&str, f64)] = &[
    // Market direction
    ("bullish", 2.4),
    ("bearish", -2.4),
    ("rally", 2.0),
    ("rallies", 2.0),
    ("rallied", 2.0),
    ("surge", 2.2),
    ("surges", 2.2),
    ("surged", 2.2),
    ("soar", 2.5),
    ("soars", 2.5),
    ("soared", 2.5),
    ("jump", 1.5),
    ("jumps", 1.5),
    ("jumped", 1.5),
    ("climb", 1.3),
    ("climbs", 1.3),
    ("gain", 1.8),
    ("gains", 1.8),
    ("rise", 1.2),
    ("rises", 1.2),
    ("rebound", 1.6),
    ("recovery", 1.5),
    ("record", 1.1),
    ("plunge", -2.6),
    ("plunges", -2.6),
    ("plunged", -2.6),
    ("crash", -3.0),
    ("crashes", -3.0),
    ("tumble", -2.2),
    ("tumbles", -2.2),
    ("slump", -2.1),
    ("slumps", -2.1),
    ("slide", -1.4),
    ("slides", -1.4),
    ("drop", -1.4),
    ("drops", -1.4),
    ("fall", -1.4),
    ("falls", -1.4),
    ("fell", -1.4),
    ("decline", -1.5),
    ("declines", -1.5),
    ("sink", -1.6),
    ("sinks", -1.6),
    ("selloff", -2.2),
    // Results and guidance
    ("beat", 1.6),
    ("beats", 1.6),
    ("exceed", 1.6),
    ("exceeds", 1.6),
    ("profit", 1.8),
    ("profitable", 1.9),
    ("growth", 1.7),
    ("growing", 1.4),
    ("strong", 2.1),
    ("stronger", 2.0),
    ("robust", 1.9),
    ("upgrade", 1.9),
    ("upgraded", 1.9),
    ("outperform", 1.8),
    ("upside", 1.5),
    ("optimistic", 2.0),
    ("boost", 1.7),
    ("boosts", 1.7),
    ("win", 2.3),
    ("wins", 2.3),
    ("success", 2.7),
    ("successful", 2.7),
    ("breakthrough", 2.3),
    ("innovative", 1.9),
    ("dividend", 0.8),
    ("buyback", 1.0),
    ("miss", -1.6),
    ("misses", -1.6),
    ("missed", -1.6),
    ("loss", -2.0),
    ("losses", -2.0),
    ("weak", -1.9),
    ("weaker", -1.8),
    ("downgrade", -1.9),
    ("downgraded", -1.9),
    ("underperform", -1.8),
    ("downside", -1.5),
    ("pessimistic", -1.9),
    ("disappoint", -2.0),
    ("disappointing", -2.2),
    ("disappointed", -2.1),
    ("warning", -1.7),
    ("warns", -1.7),
    ("cut", -1.1),
    ("cuts", -1.1),
    ("layoff", -2.0),
    ("layoffs", -2.0),
    ("bankruptcy", -3.0),
    ("default", -2.0),
    ("fraud", -3.2),
    ("lawsuit", -1.9),
    ("probe", -1.4),
    ("investigation", -1.5),
    ("recall", -1.6),
    ("fined", -1.6),
    ("penalty", -1.8),
    ("risk", -1.1),
    ("risks", -1.1),
    ("risky", -1.4),
    ("concern", -1.3),
    ("concerns", -1.3),
    ("fear", -2.2),
    ("fears", -2.2),
    ("volatile", -1.1),
    ("uncertainty", -1.4),
    ("headwind", -1.3),
    ("headwinds", -1.3),
    ("tailwind", 1.3),
    ("tailwinds", 1.3),
    // General tone
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 3.2),
    ("positive", 2.3),
    ("best", 3.2),
    ("better", 1.9),
    ("love", 3.2),
    ("happy", 2.7),
    ("bad", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("negative", -2.7),
    ("terrible", -3.0),
    ("awful", -2.8),
    ("trouble", -1.7),
    ("problem", -1.7),
    ("problems", -1.7),
    ("fail", -2.3),
    ("fails", -2.3),
    ("failed", -2.3),
    ("failure", -2.3),
    ("crisis", -3.1),
    ("panic", -2.3),
    ("hope", 1.9),
    ("confident", 2.2),
    ("confidence", 2.3),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("very", BOOSTER_INCR),
    ("extremely", BOOSTER_INCR),
    ("highly", BOOSTER_INCR),
    ("hugely", BOOSTER_INCR),
    ("significantly", BOOSTER_INCR),
    ("sharply", BOOSTER_INCR),
    ("substantially", BOOSTER_INCR),
    ("strongly", BOOSTER_INCR),
    ("deeply", BOOSTER_INCR),
    ("most", BOOSTER_INCR),
    ("more", BOOSTER_INCR),
    ("slightly", BOOSTER_DECR),
    ("somewhat", BOOSTER_DECR),
    ("marginally", BOOSTER_DECR),
    ("barely", BOOSTER_DECR),
    ("modestly", BOOSTER_DECR),
    ("little", BOOSTER_DECR),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nor", "neither", "without", "cannot", "can't", "don't",
    "doesn't", "didn't", "isn't", "aren't", "wasn't", "weren't", "won't", "wouldn't",
    "couldn't", "shouldn't", "hasn't", "haven't", "hadn't",
];

#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
            negations: NEGATIONS.iter().copied().collect(),
        }
    }

    /// Compound score in [-1, 1], rounded to four decimals.
    pub fn score(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let mixed_case = tokens.iter().any(|t| is_all_caps(t))
            && tokens.iter().any(|t| !is_all_caps(t));
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

        let mut valences = Vec::with_capacity(lowered.len());
        for (i, word) in lowered.iter().enumerate() {
            let Some(&base) = self.lexicon.get(word.as_str()) else {
                valences.push(0.0);
                continue;
            };

            let mut valence = base;
            if mixed_case && is_all_caps(tokens[i]) {
                valence += CAPS_INCR * base.signum();
            }

            for (distance, damping) in LOOKBACK_DAMPING.iter().enumerate() {
                let Some(j) = i.checked_sub(distance + 1) else {
                    break;
                };
                let prev = lowered[j].as_str();
                if let Some(&boost) = self.boosters.get(prev) {
                    valence += boost * base.signum() * damping;
                }
                if self.negations.contains(prev) {
                    valence *= NEGATION_SCALAR;
                }
            }

            valences.push(valence);
        }

        apply_but_rule(&lowered, &mut valences);

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
            sum += bangs * EXCLAMATION_INCR * sum.signum();
        }

        round4(normalize(sum))
    }

    /// Scores an article from its title and description joined by a space.
    pub fn score_article(&self, title: &str, description: &str) -> f64 {
        self.score(&article_text(title, description))
    }
}

pub fn article_text(title: &str, description: &str) -> String {
    match (title.is_empty(), description.is_empty()) {
        (true, true) => String::new(),
        _ => format!("{title} {description}"),
    }
}

/// Sentiment before "but" is dampened, sentiment after it emphasized.
fn apply_but_rule(words: &[String], valences: &mut [f64]) {
    let Some(pivot) = words.iter().position(|w| w == "but") else {
        return;
    };
    for (i, v) in valences.iter_mut().enumerate() {
        if i < pivot {
            *v *= 0.5;
        } else if i > pivot {
            *v *= 1.5;
        }
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !(c.is_alphanumeric() || c == '\'')))
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_all_caps(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && !token.chars().any(char::is_lowercase)
}

fn normalize(sum: f64) -> f64 {
    let score = sum / (sum * sum + ALPHA).sqrt();
    score.clamp(-1.0, 1.0)
}

fn round4(x: f64) -> f64 {
    let r = (x * 10_000.0).round_ties_even() / 10_000.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
