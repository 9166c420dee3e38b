//! Deterministic PRNG for seeded random enumeration.

/// xorshift64* generator. The seed is diffused through splitmix64 so that
/// small or zero seeds still produce a usable state.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut state = splitmix64(seed);
        if state == 0 {
            state = 0x9E37_79B9_7F4A_7C15;
        }
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `low..=high_inclusive`.
    pub fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        debug_assert!(low <= high_inclusive);
        let span = (high_inclusive - low) as u64 + 1;
        low + (self.next_u64() % span) as usize
    }

    pub fn gen_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
