use std::ptr;

use log::debug;

use crate::error::{fatal, Error};

/// Default code region size: 128 pages, half a megabyte.
pub const DEFAULT_CODE_SIZE: usize = 128 * 4096;

/// A fixed-size readable+writable+executable region with a monotonically
/// advancing write cursor. Unemitted bytes hold `0xCC` (int3) so that any
/// stray execution traps instead of running into neighbouring data.
///
/// The cursor is stored as a raw address because `*PROGRAM*` exposes the
/// cursor slot itself to guest code.
pub struct CodeBuffer {
    base: *mut u8,
    size: usize,
    next: *mut u8,
}

impl CodeBuffer {
    /// Map a region of `size` bytes as R+W+X. The kernel hands back a
    /// page-aligned mapping, which the protection flags require.
    pub fn new(size: usize) -> Result<Self, Error> {
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
                libc::MAP_ANON | libc::MAP_PRIVATE,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(Error::AllocationFailed(format!(
                "mmap of {size} byte executable region: {}",
                std::io::Error::last_os_error()
            )));
        }
        let base = base as *mut u8;
        unsafe { ptr::write_bytes(base, 0xcc, size) };
        debug!("mapped {size} byte code buffer at {base:p}");
        Ok(Self {
            base,
            size,
            next: base,
        })
    }

    /// Address the next emitted byte will land at. Captured before a
    /// definition body to name the function's entry point.
    pub fn cursor(&self) -> *mut u8 {
        self.next
    }

    /// Address of the cursor variable itself, for the `*PROGRAM*` handle.
    pub fn cursor_slot(&mut self) -> *mut *mut u8 {
        &mut self.next
    }

    /// Bytes emitted so far.
    pub fn code(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base, self.next as usize - self.base as usize) }
    }

    fn bump(&mut self, len: usize) -> *mut u8 {
        self.try_bump(len).unwrap_or_else(|e| fatal(e))
    }

    fn try_bump(&mut self, len: usize) -> Result<*mut u8, Error> {
        let at = self.next;
        let start = self.base as usize;
        let end = start + self.size;
        if (at as usize) < start || (at as usize) + len > end {
            return Err(Error::AllocationFailed(format!(
                "code buffer exhausted at {at:p} (+{len} bytes)"
            )));
        }
        self.next = unsafe { at.add(len) };
        Ok(at)
    }

    pub fn write_u8(&mut self, byte: u8) {
        let at = self.bump(1);
        unsafe { at.write(byte) };
    }

    pub fn write_u32(&mut self, value: u32) {
        let at = self.bump(4);
        unsafe { ptr::copy_nonoverlapping(value.to_le_bytes().as_ptr(), at, 4) };
    }

    pub fn write_u64(&mut self, value: u64) {
        let at = self.bump(8);
        unsafe { ptr::copy_nonoverlapping(value.to_le_bytes().as_ptr(), at, 8) };
    }
}

impl Drop for CodeBuffer {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.base as *mut _, self.size) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_trap_filled() {
        let buf = CodeBuffer::new(4096).unwrap();
        let first = unsafe { buf.cursor().read() };
        assert_eq!(first, 0xcc);
        assert!(buf.code().is_empty());
    }

    #[test]
    fn writes_advance_the_cursor_monotonically() {
        let mut buf = CodeBuffer::new(4096).unwrap();
        let start = buf.cursor() as usize;
        buf.write_u8(0xdb);
        assert_eq!(buf.cursor() as usize, start + 1);
        buf.write_u32(0xdeadbeef);
        assert_eq!(buf.cursor() as usize, start + 5);
        buf.write_u64(1);
        assert_eq!(buf.cursor() as usize, start + 13);
        assert_eq!(buf.code().len(), 13);
    }

    #[test]
    fn writing_past_the_end_is_an_allocation_failure() {
        let mut buf = CodeBuffer::new(4).unwrap();
        for byte in [0x48, 0x89, 0xf8, 0xc3] {
            buf.write_u8(byte);
        }
        // the buffer is full; the next write_u8 reports this fatally
        let err = buf.try_bump(1).unwrap_err();
        assert!(err.to_string().contains("code buffer exhausted"), "message: {err}");
    }

    #[test]
    fn writes_are_little_endian() {
        let mut buf = CodeBuffer::new(4096).unwrap();
        buf.write_u32(0xdeadbeef);
        assert_eq!(buf.code(), &[0xef, 0xbe, 0xad, 0xde]);
    }
}
