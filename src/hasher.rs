use std::fmt;

/// Seed mixed with the payload length before any byte is hashed.
const SEED: i32 = 31_415_926;

/// Per-record checksum of the content store.
///
/// The value is seeded with the payload length, so the total length must be
/// known up front; bytes can then be fed incrementally. Bytes are mixed in as
/// signed values.
#[derive(Clone)]
pub struct Hasher {
    value: i32,
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hasher({})", self.value)
    }
}

impl Hasher {
    pub fn new(len: usize) -> Self {
        Self {
            value: SEED.wrapping_add(len as i32),
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        for &b in data {
            self.value = (self.value << 5).wrapping_add(self.value) ^ (b as i8 as i32);
        }
    }

    pub fn checksum(&self) -> i32 {
        self.value
    }
}

/// One-shot checksum of a whole payload.
pub fn checksum(data: &[u8]) -> i32 {
    let mut hasher = Hasher::new(data.len());
    hasher.write(data);
    hasher.checksum()
}
