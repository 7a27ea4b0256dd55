//! CRC-CCITT as used by HDLC (CRC-16/X-25).
//!
//! Polynomial 0x1021, reflected, seed 0xFFFF. The transmitted check value is
//! the one's complement of the running register, low byte first. Running the
//! register over a frame *including* its check bytes always leaves
//! [`GOOD_RESIDUE`].

use crc::{Crc, Digest, CRC_16_IBM_SDLC, CRC_16_KERMIT};

/// Register value at the start of every frame.
pub const INIT: u16 = 0xFFFF;

/// Register value after a frame and its check bytes were folded in.
pub const GOOD_RESIDUE: u16 = 0xF0B8;

/// Number of check bytes trailing each frame.
pub const CRC_LEN: usize = 2;

// Same polynomial and reflection; KERMIT has no final XOR, so finalize()
// exposes the raw register, X-25 (IBM SDLC) exposes the complemented one.
static REGISTER: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);
static CHECK: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Fold `bytes` into a CRC register that currently holds `seed`.
///
/// Feeding a sequence in pieces, chaining each result as the next seed, gives
/// the same register as one call over the whole sequence.
pub fn crc_update(seed: u16, bytes: &[u8]) -> u16 {
    // The crc crate reflects the initial value of reflected algorithms;
    // `seed` is already in register order.
    let mut digest = REGISTER.digest_with_initial(seed.reverse_bits());
    digest.update(bytes);
    digest.finalize()
}

/// Register left after running over an address byte followed by the
/// reassembled frame body (control, payload and check bytes).
pub fn frame_residue(address: u8, body: &[u8]) -> u16 {
    let mut digest = REGISTER.digest_with_initial(INIT);
    digest.update(&[address]);
    digest.update(body);
    digest.finalize()
}

/// Running check value for one outbound frame.
///
/// Bytes are folded in before they are escaped, so the check covers the
/// logical frame rather than its stuffed wire form.
#[derive(Clone)]
pub struct FrameCheck {
    digest: Digest<'static, u16>,
}

impl FrameCheck {
    /// Start a new frame.
    pub fn new() -> Self {
        Self {
            digest: CHECK.digest(),
        }
    }

    pub fn update(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// The complemented check value, in wire order (low byte first).
    pub fn finish(self) -> [u8; CRC_LEN] {
        self.digest.finalize().to_le_bytes()
    }
}

impl Default for FrameCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCheck").finish_non_exhaustive()
    }
}
