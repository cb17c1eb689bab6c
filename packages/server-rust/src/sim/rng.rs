//! A small, from-scratch mulberry32 PRNG for the simulation harness.
//!
//! This intentionally does not use the `rand` crate: mulberry32's entire
//! value is that its output sequence is pinned to one specific, tiny
//! algorithm, so two runs (possibly on different platforms, possibly years
//! apart) draw bit-identical numbers from the same seed. Swapping in
//! `rand`'s `SmallRng` or similar would mean betting that crate's internal
//! algorithm never changes across versions -- a bet this harness doesn't
//! need to make for roughly a dozen lines of arithmetic.

/// Seeded pseudo-random generator. Same seed, same sequence, always.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u32,
    state: u32,
}

impl SeededRng {
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// Restarts the sequence from the original seed.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(a | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// A float in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// An integer in `[lo, hi]` inclusive. Returns `lo` if `hi <= lo`.
    pub fn random_int(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f64;
        lo + (self.random() * span).floor() as i64
    }

    /// `true` with probability `p`, clamped to `[0, 1]`.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.random() < p.clamp(0.0, 1.0)
    }

    /// Fisher-Yates shuffle, in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.is_empty() {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.random_int(0, i as i64) as usize;
            items.swap(i, j);
        }
    }

    /// Picks one element uniformly at random.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.random_int(0, (items.len() - 1) as i64) as usize;
        items.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        let seq_a: Vec<f64> = (0..10).map(|_| a.random()).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.random()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SeededRng::new(1);
        let mut b = SeededRng::new(2);
        assert_ne!(a.random(), b.random());
    }

    #[test]
    fn reset_replays_the_sequence() {
        let mut rng = SeededRng::new(7);
        let first = rng.random();
        rng.reset();
        let replayed = rng.random();
        assert_eq!(first, replayed);
    }

    #[test]
    fn random_int_stays_in_bounds() {
        let mut rng = SeededRng::new(123);
        for _ in 0..200 {
            let value = rng.random_int(5, 9);
            assert!((5..=9).contains(&value));
        }
    }

    #[test]
    fn random_int_degenerate_range_returns_lo() {
        let mut rng = SeededRng::new(1);
        assert_eq!(rng.random_int(3, 3), 3);
        assert_eq!(rng.random_int(5, 2), 5);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SeededRng::new(9);
        let mut items: Vec<i32> = (0..10).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn pick_returns_an_element_from_the_slice() {
        let mut rng = SeededRng::new(3);
        let items = [10, 20, 30];
        let picked = *rng.pick(&items).unwrap();
        assert!(items.contains(&picked));
    }

    #[test]
    fn pick_on_empty_slice_is_none() {
        let mut rng = SeededRng::new(3);
        let items: [i32; 0] = [];
        assert_eq!(rng.pick(&items), None);
    }
}
