use std::ptr::NonNull;

use log::{debug, trace};

use crate::{
  align,
  block::{self, BlockInfo, DWORD, MIN_BLOCK, Tag, WSIZE},
  error::{HeapError, PoolError},
  region::Region,
};

/// Padding word, prologue header, prologue footer and epilogue header.
const SETUP_SIZE: usize = 4 * WSIZE;

/// First-fit allocator over a fixed region, with boundary tags and
/// immediate coalescing.
///
/// ```text
///   0      4      8     12     16                               brk
///   ┌──────┬──────┬──────┬──────┬─────────┬──────────┬──────┬────┐
///   │ pad  │ 8|1  │ 8|1  │ hdr  │  ....   │   ....   │ ftr  │0|1 │
///   └──────┴──────┴──────┴──────┴─────────┴──────────┴──────┴────┘
///           └ prologue ┘   ▲      real blocks                 ▲
///                          │                                  └ epilogue
///                          └ first real block header
/// ```
///
/// The allocator is single-threaded: it is neither `Send` nor `Sync`, and
/// it cannot be cloned.
pub struct TagAllocator {
  region: Region,
  head: usize,
}

impl TagAllocator {
  /// Creates an allocator managing exactly `capacity` bytes.
  ///
  /// Fails with [`PoolError::OutOfMemory`] if the buffer cannot be obtained
  /// and with [`PoolError::PoolTooSmall`] if it cannot hold the setup span.
  pub fn new(capacity: u32) -> Result<Self, PoolError> {
    let mut region = Region::new(capacity)?;

    let start = region.grow(SETUP_SIZE as isize).ok_or_else(|| {
      debug!("capacity {} cannot hold the setup span", capacity);
      PoolError::PoolTooSmall { capacity }
    })?;

    region.write_word(start, Tag::pack(0, false).word());
    region.write_word(start + WSIZE, Tag::pack(DWORD, true).word());
    region.write_word(start + 2 * WSIZE, Tag::pack(DWORD, true).word());
    region.write_word(start + 3 * WSIZE, Tag::EPILOGUE.word());

    debug!("tag allocator ready, capacity = {}", capacity);

    Ok(Self {
      region,
      head: start + DWORD,
    })
  }

  /// Allocates at least `size` bytes and returns a double-word aligned
  /// pointer to them, or `None` when no free block fits and the region
  /// cannot grow enough. A zero `size` always returns `None`.
  ///
  /// The payload is not zeroed.
  pub fn allocate(
    &mut self,
    size: u32,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }

    let needed = block::required_size(size)?;

    let bp = match self.find_first_fit(needed) {
      Some(bp) => bp,
      None => self.extend(needed)?,
    };

    self.place(bp, needed);

    trace!("allocate({}) -> block {} of {} bytes", size, bp, self.tag(bp).size());

    Some(self.region.ptr_at(bp))
  }

  /// Releases a pointer returned by [`TagAllocator::allocate`] and merges
  /// the block with its free neighbours. A null pointer is ignored.
  ///
  /// Releasing the same pointer twice, or a pointer that did not come from
  /// this allocator, corrupts the block structure. Such pointers are still
  /// only ever dereferenced through bounds-checked offsets, so the worst
  /// outcome is a panic or bogus future allocations.
  pub fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    let Some(ptr) = NonNull::new(ptr) else {
      return;
    };

    let bp = self.region.offset_of(ptr);
    let size = self.tag(bp).size();

    block::write_tags(&mut self.region, bp, Tag::pack(size, false));

    trace!("release block {} of {} bytes", bp, size);

    self.coalesce(bp);
  }

  pub fn capacity(&self) -> usize {
    self.region.capacity()
  }

  /// Bytes of the region formatted into blocks so far.
  pub fn high_water_mark(&self) -> usize {
    self.region.brk()
  }

  /// Walks the real blocks between the prologue and the epilogue in
  /// address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      region: &self.region,
      bp: self.head,
    }
  }

  /// Verifies every structural invariant of the block sequence.
  pub fn check(&self) -> Result<(), HeapError> {
    let prologue = Tag::pack(DWORD, true);
    if self.tag(self.head) != prologue || block::read_tag(&self.region, self.head) != prologue {
      return Err(HeapError::BadPrologue);
    }

    let brk = self.region.brk();
    let mut bp = block::next(&self.region, self.head);
    let mut previous_free: Option<usize> = None;

    while bp < brk {
      let header = self.tag(bp);
      let size = header.size();

      if bp % DWORD != 0 {
        return Err(HeapError::Misaligned { offset: bp });
      }
      if size < MIN_BLOCK || size % DWORD != 0 {
        return Err(HeapError::BadSize { offset: bp, size });
      }
      if bp + size > brk {
        return Err(HeapError::Overrun { offset: bp });
      }

      let footer = block::read_tag(&self.region, block::footer(&self.region, bp));
      if header != footer {
        return Err(HeapError::TagMismatch {
          offset: bp,
          header: header.word(),
          footer: footer.word(),
        });
      }

      match previous_free {
        Some(offset) if !header.is_allocated() => {
          return Err(HeapError::Uncoalesced { offset, next: bp });
        }
        _ => {}
      }
      previous_free = (!header.is_allocated()).then_some(bp);

      bp += size;
    }

    if bp != brk || self.tag(bp) != Tag::EPILOGUE {
      return Err(HeapError::BadEpilogue { offset: bp });
    }

    Ok(())
  }

  fn tag(
    &self,
    bp: usize,
  ) -> Tag {
    block::read_tag(&self.region, block::header(bp))
  }

  fn find_first_fit(
    &self,
    needed: usize,
  ) -> Option<usize> {
    let top = self.region.brk();
    let mut bp = self.head;

    while bp < top {
      let tag = self.tag(bp);

      if !tag.is_allocated() && tag.size() >= needed {
        return Some(bp);
      }

      bp += tag.size();
    }

    None
  }

  /// Grows the region by `bytes`, formats the new span as one free block
  /// and merges it with a free predecessor. The old epilogue header becomes
  /// the new block's header.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<usize> {
    let bytes = align!(bytes, DWORD);
    let bp = self.region.grow(isize::try_from(bytes).ok()?)?;

    block::write_tags(&mut self.region, bp, Tag::pack(bytes, false));
    self.region.write_word(block::header(bp + bytes), Tag::EPILOGUE.word());

    trace!("extended region by {} bytes at {}", bytes, bp);

    Some(self.coalesce(bp))
  }

  /// Marks the free block at `bp` allocated, splitting off the tail when it
  /// can still hold a minimum block.
  fn place(
    &mut self,
    bp: usize,
    needed: usize,
  ) {
    let total = self.tag(bp).size();
    debug_assert!(total >= needed && !self.tag(bp).is_allocated());

    if total - needed < MIN_BLOCK {
      block::write_tags(&mut self.region, bp, Tag::pack(total, true));
      return;
    }

    block::write_tags(&mut self.region, bp, Tag::pack(needed, true));
    block::write_tags(&mut self.region, bp + needed, Tag::pack(total - needed, false));

    trace!("split block {}: {} + {}", bp, needed, total - needed);
  }

  /// Merges the free block at `bp` with its free physical neighbours and
  /// returns the offset of the resulting block.
  fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let prev = block::prev(&self.region, bp);
    let next = block::next(&self.region, bp);

    let prev_tag = self.tag(prev);
    let next_tag = self.tag(next);
    let size = self.tag(bp).size();

    let (start, merged) = match (prev_tag.is_allocated(), next_tag.is_allocated()) {
      (true, true) => return bp,
      (false, true) => (prev, prev_tag.size() + size),
      (true, false) => (bp, size + next_tag.size()),
      (false, false) => (prev, prev_tag.size() + size + next_tag.size()),
    };

    block::write_tags(&mut self.region, start, Tag::pack(merged, false));

    trace!("coalesced block {} into {} ({} bytes)", bp, start, merged);

    start
  }
}

/// Iterator returned by [`TagAllocator::blocks`].
pub struct Blocks<'a> {
  region: &'a Region,
  bp: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    // The first step skips the prologue.
    self.bp = block::next(self.region, self.bp);

    if self.bp >= self.region.brk() {
      return None;
    }

    let tag = block::read_tag(self.region, block::header(self.bp));

    Some(BlockInfo {
      offset: self.bp,
      size: tag.size(),
      allocated: tag.is_allocated(),
    })
  }
}
