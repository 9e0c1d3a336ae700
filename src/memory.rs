//! Access to the memory being rendered.
//!
//! Rendering follows pointers it knows nothing about, so every access goes
//! through a `Memory` that can say no instead of faulting.

use std::ops::Range;

use object::{Object, ObjectSection};
use rangemap::RangeMap;

use crate::error::Result;

/// Largest amount moved through the probe pipe at once. Writes up to this
/// size are atomic on every Unix we care about and never exceed the pipe's
/// capacity.
const CHUNK: usize = 4096;

/// A source of bytes addressed like the inspected program's memory.
pub trait Memory {
    /// Checks whether `len` bytes starting at `addr` can be read.
    fn is_readable(&self, addr: u64, len: usize) -> bool;

    /// Copies `buf.len()` bytes starting at `addr` into `buf`. Returns `None`
    /// if any of them cannot be read.
    fn read(&self, addr: u64, buf: &mut [u8]) -> Option<()>;

    fn read_vec(&self, addr: u64, len: usize) -> Option<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read(addr, &mut buf)?;
        Some(buf)
    }
}

impl<M: Memory + ?Sized> Memory for &M {
    fn is_readable(&self, addr: u64, len: usize) -> bool {
        (**self).is_readable(addr, len)
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> Option<()> {
        (**self).read(addr, buf)
    }
}

#[cfg(unix)]
pub use live::LiveMemory;

#[cfg(unix)]
mod live {
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    use super::{Memory, CHUNK};

    /// The current process's own address space.
    ///
    /// Bytes are copied by writing them from their address into a pipe and
    /// reading them back out. The kernel validates the source range and fails
    /// the write with `EFAULT` for unmapped memory, so a bad pointer costs an
    /// error code rather than a signal.
    ///
    /// A `LiveMemory` must not be shared between threads that read
    /// concurrently; create one per renderer.
    pub struct LiveMemory {
        read_end: OwnedFd,
        write_end: OwnedFd,
    }

    impl LiveMemory {
        pub fn new() -> io::Result<Self> {
            let mut fds = [0; 2];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: pipe() succeeded, so both descriptors are open and
            //         owned by nobody else.
            let (read_end, write_end) = unsafe {
                (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))
            };
            for fd in [&read_end, &write_end] {
                if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
                    return Err(io::Error::last_os_error());
                }
            }
            Ok(Self { read_end, write_end })
        }

        /// Moves one chunk through the pipe. `buf` is at most `CHUNK` bytes.
        fn copy_chunk(&self, addr: u64, buf: &mut [u8]) -> bool {
            let src = addr as usize as *const libc::c_void;
            // SAFETY: the kernel reads from `src` on our behalf and reports
            //         an unreadable range as EFAULT instead of touching it
            //         from user space.
            let written = unsafe {
                libc::write(self.write_end.as_raw_fd(), src, buf.len())
            };
            if written < 0 {
                return false;
            }
            let written = written as usize;

            let mut got = 0;
            while got < written {
                let rest = &mut buf[got..written];
                // SAFETY: `rest` is a valid, writable slice of the given
                //         length.
                let n = unsafe {
                    libc::read(
                        self.read_end.as_raw_fd(),
                        rest.as_mut_ptr().cast(),
                        rest.len(),
                    )
                };
                if n <= 0 {
                    return false;
                }
                got += n as usize;
            }
            written == buf.len()
        }
    }

    impl Memory for LiveMemory {
        fn is_readable(&self, addr: u64, len: usize) -> bool {
            let mut scratch = [0u8; CHUNK];
            let mut offset = 0;
            while offset < len {
                let n = (len - offset).min(CHUNK);
                if !self.copy_chunk(addr.wrapping_add(offset as u64), &mut scratch[..n]) {
                    return false;
                }
                offset += n;
            }
            true
        }

        fn read(&self, addr: u64, buf: &mut [u8]) -> Option<()> {
            for (i, chunk) in buf.chunks_mut(CHUNK).enumerate() {
                let at = addr.wrapping_add((i * CHUNK) as u64);
                if !self.copy_chunk(at, chunk) {
                    return None;
                }
            }
            Some(())
        }
    }
}

/// Memory made of separately-addressed byte blocks, such as the sections of
/// an object file. Everything outside the blocks is unreadable.
#[derive(Clone, Debug, Default)]
pub struct ImageMemory {
    /// Base address and contents of each block.
    blocks: Vec<(u64, Vec<u8>)>,
    /// Address range to index in `blocks`.
    spans: RangeMap<u64, usize>,
}

impl ImageMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `bytes` at `base`. A later block shadows any earlier one it
    /// overlaps.
    pub fn add(&mut self, base: u64, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return;
        }
        let span = base..base.saturating_add(bytes.len() as u64);
        self.spans.insert(span, self.blocks.len());
        self.blocks.push((base, bytes));
    }

    /// Maps the allocated sections of an object file that have contents at
    /// their link-time addresses.
    pub fn from_object(object: &object::File<'_>) -> Result<Self> {
        let mut mem = Self::new();
        for section in object.sections() {
            if section.address() == 0 {
                continue;
            }
            let data = section.uncompressed_data()?;
            mem.add(section.address(), data.into_owned());
        }
        Ok(mem)
    }

    /// Finds the visible span containing `addr` and the block behind it.
    fn block(&self, addr: u64) -> Option<(&Range<u64>, u64, &[u8])> {
        let (span, &index) = self.spans.get_key_value(&addr)?;
        let (base, bytes) = self.blocks.get(index)?;
        Some((span, *base, bytes))
    }
}

impl Memory for ImageMemory {
    fn is_readable(&self, addr: u64, len: usize) -> bool {
        let end = match addr.checked_add(len as u64) {
            Some(end) => end,
            None => return false,
        };
        let mut at = addr;
        while at < end {
            match self.spans.get_key_value(&at) {
                Some((span, _)) => at = span.end,
                None => return false,
            }
        }
        true
    }

    fn read(&self, addr: u64, buf: &mut [u8]) -> Option<()> {
        let mut done = 0;
        while done < buf.len() {
            let at = addr.checked_add(done as u64)?;
            let (span, base, bytes) = self.block(at)?;
            let start = (at - base) as usize;
            let n = (buf.len() - done).min((span.end - at) as usize);
            buf[done..done + n].copy_from_slice(bytes.get(start..start + n)?);
            done += n;
        }
        Some(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn image_reads_within_and_across_blocks() {
        let mut mem = ImageMemory::new();
        mem.add(0x1000, vec![1, 2, 3, 4]);
        mem.add(0x1004, vec![5, 6]);
        mem.add(0x2000, vec![9; 8]);
        mem.add(0x2002, vec![7, 7]);

        let mut buf = [0; 6];
        assert_eq!(mem.read(0x1000, &mut buf), Some(()));
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
        assert_eq!(mem.read_vec(0x1002, 2), Some(vec![3, 4]));
        assert!(mem.is_readable(0x1001, 5));
        assert!(!mem.is_readable(0x1001, 6));
        assert_eq!(mem.read_vec(0x0fff, 2), None);
        assert_eq!(mem.read_vec(0x2000, 8), Some(vec![9, 9, 7, 7, 9, 9, 9, 9]));
    }

    #[test]
    fn image_nothing_mapped() {
        let mem = ImageMemory::new();
        assert!(!mem.is_readable(0, 1));
        assert!(mem.is_readable(0x1234, 0));
        assert_eq!(mem.read_vec(0x10, 1), None);
    }

    #[cfg(unix)]
    #[test]
    fn live_reads_own_memory() {
        let mem = LiveMemory::new().unwrap();
        let value: u64 = 0x1122_3344_5566_7788;
        let addr = &value as *const u64 as u64;

        assert!(mem.is_readable(addr, 8));
        assert_eq!(mem.read_vec(addr, 8), Some(value.to_ne_bytes().to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn live_rejects_bad_addresses() {
        let mem = LiveMemory::new().unwrap();
        assert!(!mem.is_readable(0, 1));
        assert!(!mem.is_readable(8, 8));
        assert_eq!(mem.read_vec(0, 8), None);

        // A failed read must not leave stale bytes in the pipe.
        let value = [0xabu8; 16];
        let addr = value.as_ptr() as u64;
        assert_eq!(mem.read_vec(addr, 16), Some(value.to_vec()));
    }

    #[cfg(unix)]
    #[test]
    fn live_reads_span_chunks() {
        let mem = LiveMemory::new().unwrap();
        let big = (0..3 * CHUNK + 17).map(|i| i as u8).collect::<Vec<_>>();
        let addr = big.as_ptr() as u64;

        assert!(mem.is_readable(addr, big.len()));
        assert_eq!(mem.read_vec(addr, big.len()), Some(big.clone()));
    }
}
