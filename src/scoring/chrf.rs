//! Sentence-level chrF (character order 6, beta 2, whitespace ignored).

use std::collections::HashMap;

const CHAR_ORDER: usize = 6;
const BETA: f64 = 2.0;

fn char_ngram_counts(chars: &[char], order: usize) -> HashMap<&[char], usize> {
    let mut counts = HashMap::new();
    if chars.len() < order {
        return counts;
    }
    for window in chars.windows(order) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

fn strip_whitespace(text: &str) -> Vec<char> {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// chrF of one hypothesis against one reference on a 0–100 scale.
pub fn sentence_chrf(hypothesis: &str, reference: &str) -> f64 {
    let hyp_chars = strip_whitespace(hypothesis);
    let ref_chars = strip_whitespace(reference);

    let mut precision_sum = 0.0f64;
    let mut recall_sum = 0.0f64;
    let mut effective_order = 0usize;

    for order in 1..=CHAR_ORDER {
        let hyp_counts = char_ngram_counts(&hyp_chars, order);
        let ref_counts = char_ngram_counts(&ref_chars, order);

        let hyp_total: usize = hyp_counts.values().sum();
        let ref_total: usize = ref_counts.values().sum();
        if hyp_total == 0 || ref_total == 0 {
            continue;
        }

        let matches: usize = hyp_counts
            .iter()
            .map(|(ngram, count)| ref_counts.get(ngram).map_or(0, |other| (*count).min(*other)))
            .sum();

        precision_sum += matches as f64 / hyp_total as f64;
        recall_sum += matches as f64 / ref_total as f64;
        effective_order += 1;
    }

    if effective_order == 0 {
        return 0.0;
    }

    let precision = precision_sum / effective_order as f64;
    let recall = recall_sum / effective_order as f64;
    if precision + recall == 0.0 {
        return 0.0;
    }

    let factor = BETA * BETA;
    100.0 * (1.0 + factor) * precision * recall / (factor * precision + recall)
}
