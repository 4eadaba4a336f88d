//! Uniform permutation generator used by the order assigner.

use rand::Rng;

/// Return a uniformly shuffled copy of `items`, leaving the input untouched.
///
/// Walks the copy from the last index down to 1 and swaps each position with
/// a uniformly chosen index at or below it, so every permutation is equally
/// likely. Inputs of length 0 or 1 come back unchanged without drawing any
/// randomness.
pub fn shuffle<T, R>(items: &[T], rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.random_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_preserves_multiset() {
        let items: Vec<u32> = (0..50).collect();
        let mut rng = rand::rng();

        let mut shuffled = shuffle(&items, &mut rng);
        shuffled.sort_unstable();
        assert_eq!(shuffled, items);
    }

    #[test]
    fn shuffle_does_not_mutate_input() {
        let items = vec!["a", "b", "c", "d"];
        let snapshot = items.clone();
        let mut rng = rand::rng();

        let _ = shuffle(&items, &mut rng);
        assert_eq!(items, snapshot);
    }

    #[test]
    fn degenerate_inputs_come_back_unchanged() {
        let mut rng = rand::rng();

        let empty: Vec<u8> = Vec::new();
        assert_eq!(shuffle(&empty, &mut rng), empty);
        assert_eq!(shuffle(&[42], &mut rng), vec![42]);
    }

    #[test]
    fn shuffle_eventually_produces_a_different_ordering() {
        // With 6 elements the odds of 100 identity shuffles in a row are
        // negligible, so a stuck generator would fail here.
        let items: Vec<u32> = (0..6).collect();
        let mut rng = rand::rng();

        let moved = (0..100).any(|_| shuffle(&items, &mut rng) != items);
        assert!(moved, "shuffle never produced a new ordering");
    }
}
