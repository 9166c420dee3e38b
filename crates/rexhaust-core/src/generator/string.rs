//! Candidate input strings over a small alphabet.

use super::rng::XorShift64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RandomPlan {
    seed: u64,
    count: usize,
}

/// Enumerates every concatenation of up to `max_len` alphabet symbols,
/// shortest first and lexicographic (in alphabet order) within a length.
///
/// The sequence can be extended with one leading empty string
/// ([`StringGenerator::generate_empty`]) and a trailing seeded random sample
/// ([`StringGenerator::random`]). Both survive [`StringGenerator::reset`].
#[derive(Debug, Clone)]
pub struct StringGenerator {
    max_len: usize,
    alphabet: Vec<Vec<u8>>,
    digits: Vec<usize>,
    exhaustive_left: bool,
    pending_empty: bool,
    generate_empty: bool,
    random: Option<RandomPlan>,
    rng: Option<XorShift64>,
    random_left: usize,
}

impl StringGenerator {
    /// An empty alphabet can only spell the empty string, so `max_len` is
    /// clamped to zero.
    #[must_use]
    pub fn new<S: AsRef<[u8]>>(max_len: usize, alphabet: &[S]) -> Self {
        let alphabet: Vec<Vec<u8>> = alphabet.iter().map(|s| s.as_ref().to_vec()).collect();
        let max_len = if alphabet.is_empty() { 0 } else { max_len };
        let mut generator = Self {
            max_len,
            alphabet,
            digits: Vec::new(),
            exhaustive_left: true,
            pending_empty: false,
            generate_empty: false,
            random: None,
            rng: None,
            random_left: 0,
        };
        generator.reset();
        generator
    }

    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    #[must_use]
    pub fn alphabet_len(&self) -> usize {
        self.alphabet.len()
    }

    /// Restart from the beginning of the sequence.
    pub fn reset(&mut self) {
        self.digits.clear();
        self.exhaustive_left = true;
        self.pending_empty = self.generate_empty;
        self.rng = self.random.map(|plan| XorShift64::new(plan.seed));
        self.random_left = self.random.map_or(0, |plan| plan.count);
    }

    /// Yield one extra empty string before everything else.
    pub fn generate_empty(&mut self) {
        self.generate_empty = true;
        self.pending_empty = true;
    }

    /// Append `count` random strings, drawn from `seed`, after the
    /// exhaustive sequence.
    pub fn random(&mut self, seed: u64, count: usize) {
        self.random = Some(RandomPlan { seed, count });
        self.rng = Some(XorShift64::new(seed));
        self.random_left = count;
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.pending_empty || self.exhaustive_left || self.random_left > 0
    }

    fn current(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for &d in &self.digits {
            out.extend_from_slice(&self.alphabet[d]);
        }
        out
    }

    /// Advance the odometer; false once every string up to `max_len` has
    /// been produced.
    fn increment(&mut self) -> bool {
        for digit in self.digits.iter_mut().rev() {
            *digit += 1;
            if *digit < self.alphabet.len() {
                return true;
            }
            *digit = 0;
        }
        if self.digits.len() < self.max_len {
            self.digits.push(0);
            return true;
        }
        false
    }

    fn next_random(&mut self) -> Option<Vec<u8>> {
        let rng = self.rng.as_mut()?;
        self.random_left -= 1;
        let len = rng.gen_range_usize(0, self.max_len);
        let mut out = Vec::new();
        for _ in 0..len {
            let symbol = rng.gen_range_usize(0, self.alphabet.len() - 1);
            out.extend_from_slice(&self.alphabet[symbol]);
        }
        Some(out)
    }
}

impl Iterator for StringGenerator {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.pending_empty {
            self.pending_empty = false;
            return Some(Vec::new());
        }
        if self.exhaustive_left {
            let out = self.current();
            self.exhaustive_left = self.increment();
            return Some(out);
        }
        if self.random_left > 0 {
            if self.alphabet.is_empty() {
                self.random_left -= 1;
                return Some(Vec::new());
            }
            return self.next_random();
        }
        None
    }
}
