//! Controller-owned I/O buffer
//!
//! Each controller allocates its own buffer when the core starts, lends it
//! to the engine, and frees it when the core stops, so no buffer state is
//! shared between instances.

use std::ops::{Deref, DerefMut};

use crate::error::{Error, Result};

/// Buffer size used when a caller supplies a non-positive value
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Largest buffer a controller will allocate (16 MiB)
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Map a caller-supplied size onto a usable buffer size.
///
/// Non-positive values fall back to [`DEFAULT_BUFFER_SIZE`]; values above
/// [`MAX_BUFFER_SIZE`] are clamped to it.
pub fn normalize_buffer_size(size: i64) -> usize {
    if size <= 0 {
        DEFAULT_BUFFER_SIZE
    } else {
        usize::try_from(size).map_or(MAX_BUFFER_SIZE, |size| size.min(MAX_BUFFER_SIZE))
    }
}

/// Fixed-size zeroed buffer held for the duration of one core run
#[derive(Debug)]
pub struct PageBuffer {
    data: Box<[u8]>,
}

impl PageBuffer {
    /// Allocate a zeroed buffer of `size` bytes.
    ///
    /// Fails instead of aborting when the allocator cannot satisfy the
    /// request.
    pub fn new(size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| Error::BufferAlloc(format!("{} bytes: {}", size, e)))?;
        data.resize(size, 0u8);
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    /// Size of the buffer in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Deref for PageBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PageBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fallback() {
        assert_eq!(normalize_buffer_size(0), DEFAULT_BUFFER_SIZE);
        assert_eq!(normalize_buffer_size(-5), DEFAULT_BUFFER_SIZE);
        assert_eq!(normalize_buffer_size(8192), 8192);
        assert_eq!(normalize_buffer_size(1), 1);
    }

    #[test]
    fn test_normalize_clamps_oversized() {
        assert_eq!(normalize_buffer_size(i64::MAX), MAX_BUFFER_SIZE);
        assert_eq!(normalize_buffer_size(MAX_BUFFER_SIZE as i64 + 1), MAX_BUFFER_SIZE);
        assert_eq!(normalize_buffer_size(MAX_BUFFER_SIZE as i64), MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_page_buffer_alloc() {
        let mut buf = PageBuffer::new(16).unwrap();
        assert_eq!(buf.len(), 16);
        assert!(buf.iter().all(|&b| b == 0));
        buf[0] = 0xAB;
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn test_page_buffer_alloc_failure_is_error() {
        let result = PageBuffer::new(usize::MAX);
        assert!(matches!(result, Err(Error::BufferAlloc(_))));
    }
}
