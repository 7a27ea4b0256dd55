//! Byte stuffing.
//!
//! Flags delimit frames and never appear inside one. Any in-frame byte equal to
//! [`FLAG`] or [`ESCAPE`] is sent as `ESCAPE, byte ^ ESCAPE_XOR`.

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;

/// Escape marker.
pub const ESCAPE: u8 = 0x7D;

/// Mask applied to an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// True if `byte` must be escaped inside a frame.
pub fn needs_escape(byte: u8) -> bool {
    byte == FLAG || byte == ESCAPE
}

/// The wire form of one in-frame byte.
pub fn escaped(byte: u8) -> Escaped {
    if needs_escape(byte) {
        Escaped {
            bytes: [ESCAPE, byte ^ ESCAPE_XOR],
            pos: 0,
            len: 2,
        }
    } else {
        Escaped {
            bytes: [byte, 0],
            pos: 0,
            len: 1,
        }
    }
}

/// Iterator over the one or two wire bytes of an escaped byte.
#[derive(Debug, Clone)]
pub struct Escaped {
    bytes: [u8; 2],
    pos: u8,
    len: u8,
}

impl Iterator for Escaped {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos < self.len {
            let byte = self.bytes[self.pos as usize];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.len - self.pos) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Escaped {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bytes_are_stuffed() {
        assert_eq!(escaped(FLAG).collect::<Vec<_>>(), [ESCAPE, 0x5E]);
        assert_eq!(escaped(ESCAPE).collect::<Vec<_>>(), [ESCAPE, 0x5D]);
    }

    #[test]
    fn other_bytes_pass_through() {
        for byte in (0..=u8::MAX).filter(|b| !needs_escape(*b)) {
            let out: Vec<u8> = escaped(byte).collect();
            assert_eq!(out, [byte]);
        }
    }

    #[test]
    fn escaped_output_never_contains_flag() {
        for byte in 0..=u8::MAX {
            let out: Vec<u8> = escaped(byte).collect();
            assert!(!out.contains(&FLAG));
            if out[0] == ESCAPE {
                assert_eq!(out[1] ^ ESCAPE_XOR, byte);
            }
        }
    }

    #[test]
    fn len_tracks_remaining() {
        let mut it = escaped(FLAG);
        assert_eq!(it.len(), 2);
        it.next();
        assert_eq!(it.len(), 1);
    }
}
