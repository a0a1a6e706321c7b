use std::{ptr::NonNull, slice};

use libc::c_void;
use log::debug;

use crate::{
  block::{WSIZE, Word},
  error::PoolError,
};

/// A fixed-capacity byte buffer with a monotonic high-water mark.
///
/// ```text
///   base                      brk                        base + capacity
///   │                          │                                │
///   ▼                          ▼                                ▼
///   ┌──────────────────────────┬────────────────────────────────┐
///   │   formatted (blocks)     │        untouched capacity      │
///   └──────────────────────────┴────────────────────────────────┘
///                              ──► grow(n) moves brk by n bytes
/// ```
///
/// The buffer never moves and never shrinks. Everything below the mark is
/// reachable through [`Region::bytes`], so block metadata is always accessed
/// by bounds-checked offset.
pub struct Region {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

impl Region {
  /// Obtains a zeroed buffer of exactly `capacity` bytes.
  pub fn new(capacity: u32) -> Result<Self, PoolError> {
    let size = capacity as usize;

    let base = if size == 0 {
      NonNull::dangling()
    } else {
      // Zeroed so that every byte below the mark is initialized memory.
      let raw = unsafe { libc::calloc(size, 1) } as *mut u8;

      NonNull::new(raw).ok_or_else(|| {
        debug!("calloc refused {} bytes", size);
        PoolError::OutOfMemory { capacity }
      })?
    };

    Ok(Self {
      base,
      capacity: size,
      brk: 0,
    })
  }

  /// Advances the high-water mark by `increment` bytes and returns the
  /// previous mark, i.e. the offset where the new span starts.
  ///
  /// Negative increments and increments past the end of the buffer return
  /// `None` and leave the mark untouched. `grow(0)` reports the current mark.
  pub fn grow(
    &mut self,
    increment: isize,
  ) -> Option<usize> {
    let increment = usize::try_from(increment).ok()?;
    let end = self.brk.checked_add(increment)?;

    if end > self.capacity {
      debug!(
        "region exhausted: brk = {}, increment = {}, capacity = {}",
        self.brk, increment, self.capacity
      );
      return None;
    }

    let previous = self.brk;
    self.brk = end;

    Some(previous)
  }

  pub fn brk(&self) -> usize {
    self.brk
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// The formatted part of the buffer, `[0, brk)`.
  pub fn bytes(&self) -> &[u8] {
    // SAFETY: `[base, base + brk)` lies inside the calloc'd buffer and is
    // initialized; `brk` is zero for the dangling zero-capacity base.
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.brk) }
  }

  pub fn bytes_mut(&mut self) -> &mut [u8] {
    // SAFETY: as in `bytes`, and `&mut self` guarantees exclusivity on our side.
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.brk) }
  }

  /// Reads the word at `offset`. Panics if it is not below the mark.
  pub fn read_word(
    &self,
    offset: usize,
  ) -> Word {
    let mut word = [0u8; WSIZE];
    word.copy_from_slice(&self.bytes()[offset..offset + WSIZE]);

    Word::from_ne_bytes(word)
  }

  /// Writes the word at `offset`. Panics if it is not below the mark.
  pub fn write_word(
    &mut self,
    offset: usize,
    word: Word,
  ) {
    self.bytes_mut()[offset..offset + WSIZE].copy_from_slice(&word.to_ne_bytes());
  }

  /// Converts an offset into an absolute pointer.
  pub fn ptr_at(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    assert!(offset <= self.brk, "offset {} past brk {}", offset, self.brk);

    // SAFETY: `offset` is within (or one past) the formatted span of the buffer.
    unsafe { self.base.add(offset) }
  }

  /// Converts a pointer handed out by [`Region::ptr_at`] back into an offset.
  ///
  /// Pointers below the base wrap to huge offsets, which every later
  /// bounds-checked access rejects.
  pub fn offset_of(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize)
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    if self.capacity != 0 {
      unsafe { libc::free(self.base.as_ptr() as *mut c_void) };
    }
  }
}
