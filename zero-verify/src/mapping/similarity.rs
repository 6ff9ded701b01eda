//! String similarity for the fuzzy mapping tier.

/// A pure similarity function over two normalized names.
///
/// Implementations must return a score in `[0, 1]` and be deterministic.
pub trait SimilarityMetric: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Blend of character-level edit similarity and token overlap.
///
/// `score = 0.7 * char_ratio + 0.3 * token_overlap`, where `char_ratio` is the
/// diff ratio `2 * matches / (len(a) + len(b))` and two tokens overlap when
/// one is a prefix of the other (`rev` / `revenue`).
#[derive(Debug, Clone, Copy)]
pub struct CompositeSimilarity {
    pub char_weight: f64,
    pub token_weight: f64,
}

impl Default for CompositeSimilarity {
    fn default() -> Self {
        Self {
            char_weight: 0.7,
            token_weight: 0.3,
        }
    }
}

impl SimilarityMetric for CompositeSimilarity {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let total = self.char_weight + self.token_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let blended = (self.char_weight * char_ratio(a, b) + self.token_weight * token_overlap(a, b))
            / total;
        blended.clamp(0.0, 1.0)
    }
}

/// Character diff ratio.
pub fn char_ratio(a: &str, b: &str) -> f64 {
    f64::from(similar::TextDiff::from_chars(a, b).ratio())
}

/// Share of tokens that find a prefix-compatible partner on the other side,
/// relative to the longer token list.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let left: Vec<&str> = a.split_whitespace().collect();
    let right: Vec<&str> = b.split_whitespace().collect();
    let longest = left.len().max(right.len());
    if longest == 0 {
        return 0.0;
    }

    let mut used = vec![false; right.len()];
    let mut matched = 0usize;
    for token in &left {
        let partner = right.iter().enumerate().position(|(i, other)| {
            !used[i] && tokens_compatible(token, other)
        });
        if let Some(i) = partner {
            used[i] = true;
            matched += 1;
        }
    }
    matched as f64 / longest as f64
}

fn tokens_compatible(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= 2 && long.starts_with(short)
}
