/// Packed bitstream with optional per-bit timing and weak mask

use crate::error::{IrError, Result};

/// A packed MSB-first bit buffer as read from one track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitstream {
    /// Cylinder the bits were read from
    pub cylinder: u8,
    /// Head the bits were read from
    pub head: u8,
    bits: Vec<u8>,
    bit_count: usize,
    timing: Option<Vec<u32>>,
    weak_mask: Option<Vec<u8>>,
}

impl Bitstream {
    /// Create an empty bitstream
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap packed bytes holding `bit_count` valid bits
    pub fn from_packed(bits: Vec<u8>, bit_count: usize) -> Result<Self> {
        if bit_count > bits.len() * 8 {
            return Err(IrError::invalid(format!(
                "{} bits do not fit in {} bytes",
                bit_count,
                bits.len()
            )));
        }
        Ok(Self {
            bits,
            bit_count,
            ..Self::default()
        })
    }

    /// Build from one value per bit (non-zero means 1)
    pub fn from_bits(values: &[u8]) -> Self {
        let mut stream = Self::new();
        for &value in values {
            stream.push(value != 0);
        }
        stream
    }

    /// Append one bit
    pub fn push(&mut self, bit: bool) {
        let byte = self.bit_count / 8;
        if byte == self.bits.len() {
            self.bits.push(0);
        }
        if bit {
            self.bits[byte] |= 0x80 >> (self.bit_count % 8);
        }
        self.bit_count += 1;
    }

    /// Append the low `count` bits of `value`, most significant first
    pub fn push_bits(&mut self, value: u32, count: u32) {
        for shift in (0..count.min(32)).rev() {
            self.push((value >> shift) & 1 != 0);
        }
    }

    /// Get a bit, `None` past the end
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.bit_count {
            return None;
        }
        Some(self.bits[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    /// Read up to 32 bits starting at `offset`, `None` if they run past the end
    pub fn read_bits(&self, offset: usize, count: u32) -> Option<u32> {
        if count > 32 || offset + count as usize > self.bit_count {
            return None;
        }
        let mut value = 0u32;
        for i in 0..count as usize {
            let bit = self.bits[(offset + i) / 8] & (0x80 >> ((offset + i) % 8)) != 0;
            value = (value << 1) | bit as u32;
        }
        Some(value)
    }

    /// Number of valid bits
    #[inline]
    pub fn len(&self) -> usize {
        self.bit_count
    }

    /// Check if the bitstream holds no bits
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bit_count == 0
    }

    /// Packed bytes, MSB first
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Attach per-bit timing in nanoseconds (one entry per bit)
    pub fn set_timing(&mut self, timing: Vec<u32>) -> Result<()> {
        if timing.len() != self.bit_count {
            return Err(IrError::invalid(format!(
                "timing length {} does not match {} bits",
                timing.len(),
                self.bit_count
            )));
        }
        self.timing = Some(timing);
        Ok(())
    }

    /// Per-bit timing, if present
    pub fn timing(&self) -> Option<&[u32]> {
        self.timing.as_deref()
    }

    /// Attach a packed weak-bit mask (same packing as the bits)
    pub fn set_weak_mask(&mut self, mask: Vec<u8>) -> Result<()> {
        if mask.len() != self.bit_count.div_ceil(8) {
            return Err(IrError::invalid(format!(
                "weak mask length {} does not cover {} bits",
                mask.len(),
                self.bit_count
            )));
        }
        self.weak_mask = Some(mask);
        Ok(())
    }

    /// Packed weak-bit mask, if present
    pub fn weak_mask(&self) -> Option<&[u8]> {
        self.weak_mask.as_deref()
    }

    /// Check the weak mask for one bit
    pub fn is_weak(&self, index: usize) -> bool {
        match &self.weak_mask {
            Some(mask) if index < self.bit_count => mask[index / 8] & (0x80 >> (index % 8)) != 0,
            _ => false,
        }
    }
}
