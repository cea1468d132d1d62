//! Per-run PRNG for the simulator. SplitMix64 for throughput and good statistical quality,
//! exposed through [rand::RngCore] so `rand` distributions can draw from it.
//! Deterministic: same seed produces the same sequence. Not cryptographically secure.

use rand::{Rng, RngCore};

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

#[derive(Debug, Clone, Copy)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Uniform value in `0..bound`. `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.random_range(0..bound)
    }

    #[inline]
    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        mix(self.state)
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

#[inline]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
    z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
    z ^ (z >> 31)
}

/// Independent seed for stream `stream` of `base` (one stream per run or sweep point).
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    mix(base ^ mix(stream.wrapping_add(1).wrapping_mul(SPLITMIX64_GOLDEN)))
}

/// Seed from OS entropy, for sweeps that did not pin one.
pub fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(_) => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(SPLITMIX64_GOLDEN, |elapsed| elapsed.as_nanos() as u64),
    }
}
