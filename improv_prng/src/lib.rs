// Seedable pseudo-random number generator for solo generation.
//
// xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seed expansion.
// Hand-rolled so that a given seed yields the same solo on every platform
// and toolchain; the generator's state is plain integers and never touches
// floating point until a value is handed out.
//
// One `SoloRng` drives one generation run: it seeds the starting register
// and supplies the uniform draw for every timestep's sampling. Independent
// runs (two choruses, two soloists) get their own generator, usually derived
// from a master seed with `fork`.

use serde::{Deserialize, Serialize};

/// xoshiro256++ generator owned by a single generation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoloRng {
    s: [u64; 4],
}

impl SoloRng {
    /// Create a generator from a `u64` seed.
    ///
    /// Two generators built from the same seed produce identical streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Derive an independent child generator for stream `stream`.
    ///
    /// The parent is advanced by one draw; the child is seeded from that draw
    /// mixed with the stream id, so `fork(0)` and `fork(1)` called on clones
    /// of the same parent diverge immediately.
    pub fn fork(&mut self, stream: u64) -> SoloRng {
        let base = self.next_u64();
        let mut sm = base ^ stream.wrapping_mul(0xd1b5_4a32_d192_ed03);
        SoloRng::new(splitmix64(&mut sm))
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f32` in [0, 1) from the upper 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform `f32` in `[low, high)`. Panics if `low >= high`.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(low < high, "range_f32: low must be less than high");
        low + self.next_f32() * (high - low)
    }

    /// Uniform integer in `[low, high)`, rejection-sampled to avoid modulo
    /// bias. Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `u8` in `[low, high)`. Panics if `low >= high`.
    pub fn range_u8(&mut self, low: u8, high: u8) -> u8 {
        self.range_u64(low as u64, high as u64) as u8
    }

    /// Pick an index with probability proportional to `weights`.
    ///
    /// Inverse-CDF: one uniform draw scaled by the total weight is compared
    /// against the running cumulative sum. If float rounding leaves the draw
    /// past the final boundary, the last index with positive weight is
    /// returned. Returns `None` when no weight is positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }
        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            if cumulative > target {
                return Some(i);
            }
        }
        weights.iter().rposition(|&w| w > 0.0)
    }
}

/// SplitMix64 step, used only to expand seeds.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
