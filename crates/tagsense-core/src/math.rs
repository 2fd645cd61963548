//! Shared math utilities.

use std::cmp::Ordering;

/// Logistic sigmoid, saturating cleanly for large magnitudes.
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Apply the sigmoid to every element in place.
pub fn sigmoid_in_place(v: &mut [f32]) {
    for x in v.iter_mut() {
        *x = sigmoid(*x);
    }
}

/// Indices of `scores` ordered by descending score.
///
/// The sort is stable, so equal scores keep ascending index order. NaN sorts
/// after every number.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| descending(scores[a], scores[b]));
    indices
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_values() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.9999);
        assert!(sigmoid(-10.0) < 0.0001);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }

    #[test]
    fn test_sigmoid_monotonic() {
        let xs = [-3.0, -1.0, -0.1, 0.0, 0.1, 1.0, 3.0];
        for w in xs.windows(2) {
            assert!(sigmoid(w[0]) < sigmoid(w[1]));
        }
    }

    #[test]
    fn test_sigmoid_in_place() {
        let mut v = vec![0.0, 100.0];
        sigmoid_in_place(&mut v);
        assert!((v[0] - 0.5).abs() < 1e-6);
        assert!((v[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_descending() {
        assert_eq!(rank_descending(&[0.1, 0.9, 0.5]), vec![1, 2, 0]);
        assert!(rank_descending(&[]).is_empty());
    }

    #[test]
    fn test_rank_ties_keep_index_order() {
        assert_eq!(rank_descending(&[0.5, 0.7, 0.5, 0.7]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_rank_nan_last() {
        assert_eq!(rank_descending(&[f32::NAN, 0.2, 0.8]), vec![2, 1, 0]);
    }
}
