// src/identity/similarity.rs

//! Normalized edit-distance similarity.
//!
//! Distance is counted in extended grapheme clusters so accented names
//! ("José" vs "Jose") cost one edit, not two.

use unicode_segmentation::UnicodeSegmentation;

/// Levenshtein distance between two strings, in graphemes.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<&str> = a.graphemes(true).collect();
    let b: Vec<&str> = b.graphemes(true).collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two-row dynamic programming table.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ga) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, gb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ga != gb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / max_len`, in `[0, 1]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.graphemes(true).count().max(b.graphemes(true).count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}
