use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};

use crate::config::{BUFFER_BLOCK, BUFFER_MAX};

/// Error returned when a [GrowBuffer] would grow past its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full;

impl fmt::Display for Full {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer exceeds {} octets", BUFFER_MAX)
    }
}

impl std::error::Error for Full {}

/// A write-only, growable octet buffer.
///
/// Storage is reserved in whole blocks of `BUFFER_BLOCK` octets and never
/// exceeds `BUFFER_MAX` octets. A buffer is filled, handed to its consumer
/// whole, and dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GrowBuffer {
    data: Vec<u8>,
}

impl GrowBuffer {
    /// Create an empty buffer without reserving storage.
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Copy `bytes` to the end of the buffer.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Full> {
        self.grow(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Append `count` zero octets.
    pub fn pad(&mut self, count: usize) -> Result<(), Full> {
        self.grow(count)?;
        self.data.resize(self.data.len() + count, 0);
        Ok(())
    }

    pub fn append_u8(&mut self, value: u8) -> Result<(), Full> {
        self.append(&[value])
    }

    /// Append a 16-bit value in network byte order.
    pub fn append_u16(&mut self, value: u16) -> Result<(), Full> {
        let mut bytes = [0; 2];
        NetworkEndian::write_u16(&mut bytes, value);
        self.append(&bytes)
    }

    /// Append a 32-bit value in network byte order.
    pub fn append_u32(&mut self, value: u32) -> Result<(), Full> {
        let mut bytes = [0; 4];
        NetworkEndian::write_u32(&mut bytes, value);
        self.append(&bytes)
    }

    fn grow(&mut self, extra: usize) -> Result<(), Full> {
        let needed = self.data.len().checked_add(extra).ok_or(Full)?;
        if needed > BUFFER_MAX {
            net_error!(
                "refusing to grow buffer from {} to {} octets",
                self.data.len(),
                needed
            );
            return Err(Full);
        }

        if needed > self.data.capacity() {
            let blocks = needed.div_ceil(BUFFER_BLOCK);
            self.data.reserve_exact(blocks * BUFFER_BLOCK - self.data.len());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of octets reserved so far.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for GrowBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for GrowBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
