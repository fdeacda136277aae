//! Deterministic uniform random sources.
//!
//! Every stochastic decision in a run is derived from one [`UniformSource`].
//! Downstream generators consume a fixed number of draws per call, so the
//! order in which they are called is part of the reproducibility contract.
//!
//! [`Arc4Source`] reproduces the `seedrandom` ARC4 stream for a string seed,
//! which lets a run be replayed against recorded data from the JavaScript
//! harness. [`ChaChaSource`] is a `rand_chacha` generator keyed from the same
//! seed string.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A reproducible stream of uniform values in `[0, 1)`.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl<T: UniformSource + ?Sized> UniformSource for &mut T {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

impl<T: UniformSource + ?Sized> UniformSource for Box<T> {
    fn next_uniform(&mut self) -> f64 {
        (**self).next_uniform()
    }
}

/// Which generator backs a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Arc4,
    Chacha,
}

impl SourceKind {
    pub fn build(&self, seed: &str) -> Box<dyn UniformSource + Send> {
        match self {
            SourceKind::Arc4 => Box::new(Arc4Source::new(seed)),
            SourceKind::Chacha => Box::new(ChaChaSource::new(seed)),
        }
    }
}

const WIDTH: usize = 256;
const MASK: usize = WIDTH - 1;
const CHUNKS: usize = 6;
const START_DENOM: f64 = 281_474_976_710_656.0; // 256^6
const SIGNIFICANCE: u64 = 1 << 52;
const OVERFLOW: u64 = 1 << 53;

/// ARC4 keystream generator, compatible with `seedrandom(seed)`.
#[derive(Clone)]
pub struct Arc4Source {
    s: [u8; WIDTH],
    i: usize,
    j: usize,
}

impl Arc4Source {
    pub fn new(seed: &str) -> Self {
        Self::from_key(&mix_key(seed))
    }

    fn from_key(key: &[u8]) -> Self {
        let key: &[u8] = if key.is_empty() { &[0] } else { key };
        let mut s = [0u8; WIDTH];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut j = 0usize;
        for i in 0..WIDTH {
            let t = s[i];
            j = MASK & (j + key[i % key.len()] as usize + t as usize);
            s[i] = s[j];
            s[j] = t;
        }

        let mut source = Self { s, i: 0, j: 0 };
        // RC4-drop[256]
        source.keystream(WIDTH);
        source
    }

    /// Next `count` keystream bytes folded big-endian into an integer.
    fn keystream(&mut self, count: usize) -> u64 {
        let mut r: u64 = 0;
        let (mut i, mut j) = (self.i, self.j);
        for _ in 0..count {
            i = MASK & (i + 1);
            let t = self.s[i];
            j = MASK & (j + t as usize);
            self.s[i] = self.s[j];
            self.s[j] = t;
            let k = MASK & (self.s[i] as usize + self.s[j] as usize);
            r = r.wrapping_mul(WIDTH as u64).wrapping_add(self.s[k] as u64);
        }
        self.i = i;
        self.j = j;
        r
    }
}

impl UniformSource for Arc4Source {
    fn next_uniform(&mut self) -> f64 {
        let mut n = self.keystream(CHUNKS);
        let mut d = START_DENOM;
        let mut x: u64 = 0;
        while n < SIGNIFICANCE {
            n = (n + x) * WIDTH as u64;
            d *= WIDTH as f64;
            x = self.keystream(1);
        }
        while n >= OVERFLOW {
            n /= 2;
            d /= 2.0;
            x >>= 1;
        }
        (n as f64 + x as f64) / d
    }
}

// seedrandom's mixkey over UTF-16 code units. keys shorter than 256 are the
// low bytes of the code units; longer seeds wrap and smear into earlier slots.
fn mix_key(seed: &str) -> Vec<u8> {
    let mut key: Vec<u8> = Vec::new();
    let mut smear: u32 = 0;
    for (j, unit) in seed.encode_utf16().enumerate() {
        let slot = MASK & j;
        let existing = key.get(slot).copied().unwrap_or(0) as u32;
        smear ^= existing * 19;
        let value = (MASK as u32 & smear.wrapping_add(unit as u32)) as u8;
        if slot < key.len() {
            key[slot] = value;
        } else {
            key.push(value);
        }
    }
    key
}

/// ChaCha8 generator keyed by an FNV-1a hash of the seed string.
#[derive(Clone)]
pub struct ChaChaSource {
    rng: ChaCha8Rng,
}

impl ChaChaSource {
    pub fn new(seed: &str) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(fnv1a(seed.as_bytes())),
        }
    }
}

impl UniformSource for ChaChaSource {
    fn next_uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ *b as u64).wrapping_mul(PRIME))
}

/// Wraps a source and counts how many draws it has handed out.
pub struct CountingSource<R> {
    inner: R,
    draws: u64,
}

impl<R: UniformSource> CountingSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, draws: 0 }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: UniformSource> UniformSource for CountingSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.draws += 1;
        self.inner.next_uniform()
    }
}

/// Replays a fixed list of draws, then repeats the last one. Test and replay helper.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(draws: Vec<f64>) -> Self {
        Self { draws, cursor: 0 }
    }
}

impl UniformSource for ScriptedSource {
    fn next_uniform(&mut self) -> f64 {
        let value = match self.draws.get(self.cursor) {
            Some(v) => *v,
            None => self.draws.last().copied().unwrap_or(0.5),
        };
        self.cursor += 1;
        value
    }
}
