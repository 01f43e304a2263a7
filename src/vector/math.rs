use std::cmp::Ordering;

/// Cosine similarity in `[-1, 1]`. Zero-norm vectors score 0. Callers
/// guarantee equal lengths.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    debug_assert_eq!(query.len(), candidate.len());

    let mut dot = 0.0f32;
    let mut query_norm = 0.0f32;
    let mut candidate_norm = 0.0f32;
    for (q, c) in query.iter().zip(candidate) {
        dot += q * c;
        query_norm += q * q;
        candidate_norm += c * c;
    }

    let denom = query_norm.sqrt() * candidate_norm.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

pub fn dot_product(query: &[f32], candidate: &[f32]) -> f32 {
    query.iter().zip(candidate).map(|(q, c)| q * c).sum()
}

pub fn euclidean_distance(query: &[f32], candidate: &[f32]) -> f32 {
    query
        .iter()
        .zip(candidate)
        .map(|(q, c)| (q - c) * (q - c))
        .sum::<f32>()
        .sqrt()
}

/// Orders scores highest first; NaN sorts as equal.
pub fn descending(left: f32, right: f32) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_ignores_magnitude() {
        assert!(approx_eq(cosine_similarity(&[1.0, 1.0], &[5.0, 5.0]), 1.0));
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0));
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]), -1.0));
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn dot_and_euclid() {
        assert!(approx_eq(dot_product(&[1.0, 2.0], &[3.0, 4.0]), 11.0));
        assert!(approx_eq(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0));
    }

    #[test]
    fn descending_puts_larger_first() {
        let mut scores = vec![0.1, 0.9, 0.5];
        scores.sort_by(|a, b| descending(*a, *b));
        assert_eq!(scores, vec![0.9, 0.5, 0.1]);
    }
}
