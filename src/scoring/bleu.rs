//! Sentence-level BLEU compatible with sacreBLEU defaults: 13a tokenization,
//! exponential smoothing and effective n-gram order.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_NGRAM_ORDER: usize = 4;

// sacreBLEU substitutes this for log(0) so a zero precision dominates the mean.
const LOG_ZERO: f64 = -9_999_999_999.0;

struct Tokenizer13a {
    rules: Vec<(Regex, &'static str)>,
}

static TOKENIZER_13A: Lazy<Option<Tokenizer13a>> = Lazy::new(Tokenizer13a::build);

impl Tokenizer13a {
    fn build() -> Option<Self> {
        let patterns: [(&str, &'static str); 4] = [
            (r"([\x7B-\x7E\x5B-\x60\x20-\x26\x28-\x2B\x3A-\x40\x2F])", " ${1} "),
            (r"([^0-9])([\.,])", "${1} ${2} "),
            (r"([\.,])([^0-9])", " ${1} ${2}"),
            (r"([0-9])(-)", "${1} ${2} "),
        ];

        let mut rules = Vec::with_capacity(patterns.len());
        for (pattern, replacement) in patterns {
            rules.push((Regex::new(pattern).ok()?, replacement));
        }
        Some(Self { rules })
    }

    fn tokenize(&self, line: &str) -> Vec<String> {
        let mut text = line
            .replace("<skipped>", "")
            .replace("-\n", "")
            .replace('\n', " ");
        if text.contains('&') {
            text = text
                .replace("&quot;", "\"")
                .replace("&amp;", "&")
                .replace("&lt;", "<")
                .replace("&gt;", ">");
        }

        let mut padded = format!(" {text} ");
        for (regex, replacement) in &self.rules {
            padded = regex.replace_all(&padded, *replacement).into_owned();
        }

        padded.split_whitespace().map(str::to_string).collect()
    }
}

fn tokenize(line: &str) -> Vec<String> {
    match TOKENIZER_13A.as_ref() {
        Some(tokenizer) => tokenizer.tokenize(line),
        None => line.split_whitespace().map(str::to_string).collect(),
    }
}

fn ngram_counts(tokens: &[String], order: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() < order {
        return counts;
    }
    for window in tokens.windows(order) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

fn clipped_matches(hyp: &HashMap<&[String], usize>, reference: &HashMap<&[String], usize>) -> usize {
    hyp.iter()
        .map(|(ngram, count)| reference.get(ngram).map_or(0, |ref_count| (*count).min(*ref_count)))
        .sum()
}

fn ln_or_floor(value: f64) -> f64 {
    if value <= 0.0 { LOG_ZERO } else { value.ln() }
}

/// BLEU of one hypothesis against one reference on a 0–100 scale.
pub fn sentence_bleu(hypothesis: &str, reference: &str) -> f64 {
    let hyp_tokens = tokenize(hypothesis);
    let ref_tokens = tokenize(reference);

    let mut correct = [0usize; MAX_NGRAM_ORDER];
    let mut total = [0usize; MAX_NGRAM_ORDER];
    for order in 1..=MAX_NGRAM_ORDER {
        let hyp_counts = ngram_counts(&hyp_tokens, order);
        let ref_counts = ngram_counts(&ref_tokens, order);
        correct[order - 1] = clipped_matches(&hyp_counts, &ref_counts);
        total[order - 1] = hyp_tokens.len().saturating_sub(order - 1);
    }

    if correct.iter().all(|count| *count == 0) {
        return 0.0;
    }

    let sys_len = hyp_tokens.len() as f64;
    let ref_len = ref_tokens.len() as f64;
    let brevity_penalty = if sys_len >= ref_len {
        1.0
    } else if sys_len > 0.0 {
        (1.0 - ref_len / sys_len).exp()
    } else {
        0.0
    };

    let mut precisions = [0.0f64; MAX_NGRAM_ORDER];
    let mut smooth = 1.0f64;
    let mut effective_order = 0usize;
    for n in 0..MAX_NGRAM_ORDER {
        if total[n] == 0 {
            break;
        }
        effective_order = n + 1;
        if correct[n] == 0 {
            smooth *= 2.0;
            precisions[n] = 100.0 / (smooth * total[n] as f64);
        } else {
            precisions[n] = 100.0 * correct[n] as f64 / total[n] as f64;
        }
    }

    if effective_order == 0 {
        return 0.0;
    }

    let log_sum: f64 = precisions[..effective_order]
        .iter()
        .map(|p| ln_or_floor(*p))
        .sum();
    brevity_penalty * (log_sum / effective_order as f64).exp()
}
