use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};
use tvmasm_isa::{SEGMENT_BYTES, SEGMENT_WORDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteConflict {
    pub address: u16,
    pub existing: u16,
    pub attempted: u16,
}

impl fmt::Display for WriteConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attempted to overwrite word 0x{:04X} at 0x{:04X} with 0x{:04X}.",
            self.existing, self.address, self.attempted
        )
    }
}

/// Write-once word store covering the whole address space.
#[derive(Debug, Clone)]
pub struct Segment {
    words: Box<[Option<u16>]>,
    lines: BTreeMap<u16, usize>,
}

impl Default for Segment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment {
    pub fn new() -> Self {
        Self {
            words: vec![None; SEGMENT_WORDS].into_boxed_slice(),
            lines: BTreeMap::new(),
        }
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.words[usize::from(address)]
    }

    /// Fails on any second write to `address`, even of the same value.
    pub fn write(&mut self, address: u16, word: u16, line: usize) -> Result<(), WriteConflict> {
        let slot = &mut self.words[usize::from(address)];
        if let Some(existing) = *slot {
            return Err(WriteConflict {
                address,
                existing,
                attempted: word,
            });
        }
        *slot = Some(word);
        self.lines.insert(address, line);
        Ok(())
    }

    /// Source line of every written address.
    pub fn line_map(&self) -> &BTreeMap<u16, usize> {
        &self.lines
    }

    /// Big-endian image; unwritten slots serialize as zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SEGMENT_BYTES);
        for word in self.words.iter() {
            bytes.extend_from_slice(&word.unwrap_or(0).to_be_bytes());
        }
        bytes
    }
}

/// Uppercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:X}", Sha256::digest(bytes))
}
