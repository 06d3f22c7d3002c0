//! Vector literal encoding and similarity.
//!
//! Embeddings are persisted in the store's textual wire form: a
//! bracketed comma-separated list of float literals, e.g.
//! `[0.1,0.2,-0.33]`. An empty vector serializes to `[]`; absence is a
//! SQL NULL, never `[]`.

/// Encode a float vector as the textual wire literal.
///
/// ```rust
/// use notegraph::vector::to_literal;
/// assert_eq!(to_literal(&[0.5, -1.0]), "[0.5,-1]");
/// assert_eq!(to_literal(&[]), "[]");
/// ```
pub fn to_literal(vec: &[f32]) -> String {
    let mut out = String::with_capacity(vec.len() * 8 + 2);
    out.push('[');
    for (i, v) in vec.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

/// Decode a wire literal back into a float vector.
///
/// Returns `None` for malformed input (missing brackets or a component
/// that does not parse as a float).
pub fn parse_literal(literal: &str) -> Option<Vec<f32>> {
    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or
/// vectors of different lengths. Higher is more similar, so ranking by
/// descending similarity matches ranking by ascending distance.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
