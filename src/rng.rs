//! Default random number generator used by both generators when none is injected.

use rand::{rngs::adapter::ReseedingRng, rngs::OsRng, SeedableRng};
use rand_chacha::ChaCha12Core;

/// Default CSPRNG: [`ChaCha12Core`], initially seeded and subsequently reseeded by
/// [`OsRng`] every 64 KiB of output via [`ReseedingRng`]. The same strategy `rand`'s
/// own `ThreadRng` uses.
#[derive(Clone)]
pub struct DefaultRng(ReseedingRng<ChaCha12Core, OsRng>);

impl std::fmt::Debug for DefaultRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultRng").finish_non_exhaustive()
    }
}

impl Default for DefaultRng {
    fn default() -> Self {
        let core = ChaCha12Core::from_rng(OsRng)
            .unwrap_or_else(|err| panic!("could not seed default RNG from OsRng: {err}"));
        Self(ReseedingRng::new(core, 1024 * 64, OsRng))
    }
}

impl rand::RngCore for DefaultRng {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

impl rand::CryptoRng for DefaultRng {}
