//! Boundary tags and block navigation.
//!
//! ```text
//!        header                                   footer
//!   ┌──────────────┬─────────────────────────┬──────────────┐
//!   │ size | alloc │        payload          │ size | alloc │
//!   └──────────────┴─────────────────────────┴──────────────┘
//!                  ▲
//!                  └── block offset (what callers get a pointer to)
//! ```
//!
//! Blocks are addressed by the offset of their payload inside the managed region.
//! Sizes always include the header and footer words.

use crate::{align, region::Region};

pub type Word = u32;

/// Bytes per tag word.
pub const WSIZE: usize = size_of::<Word>();
/// Alignment unit for block sizes and payload offsets.
pub const DWORD: usize = 2 * WSIZE;
/// Header, footer and one alignment unit of payload.
pub const MIN_BLOCK: usize = 2 * DWORD;

const FLAG_MASK: Word = 0x7;
const ALLOC_BIT: Word = 0x1;

/// A packed `size | allocated` word as stored in headers and footers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag(Word);

impl Tag {
  /// The zero-size allocated tag that terminates the block sequence.
  pub const EPILOGUE: Tag = Tag::pack(0, true);

  /// `size` must be a multiple of [`DWORD`] no larger than the region capacity.
  pub const fn pack(
    size: usize,
    allocated: bool,
  ) -> Self {
    Self(size as Word | allocated as Word)
  }

  pub const fn from_word(word: Word) -> Self {
    Self(word)
  }

  pub const fn word(self) -> Word {
    self.0
  }

  pub const fn size(self) -> usize {
    (self.0 & !FLAG_MASK) as usize
  }

  pub const fn is_allocated(self) -> bool {
    self.0 & ALLOC_BIT != 0
  }
}

/// Block size needed to serve a request of `size` payload bytes.
///
/// Small requests get [`MIN_BLOCK`]; larger ones are rounded up to a
/// multiple of [`DWORD`] plus the header/footer overhead. Returns `None` if
/// the result is not addressable.
pub fn required_size(size: u32) -> Option<usize> {
  let size = u64::from(size);
  let unit = DWORD as u64;

  let needed = if size <= unit {
    MIN_BLOCK as u64
  } else {
    align!(size, unit) + unit
  };

  usize::try_from(needed).ok()
}

pub(crate) const fn header(bp: usize) -> usize {
  bp - WSIZE
}

pub(crate) fn read_tag(
  region: &Region,
  offset: usize,
) -> Tag {
  Tag::from_word(region.read_word(offset))
}

pub(crate) fn footer(
  region: &Region,
  bp: usize,
) -> usize {
  bp + read_tag(region, header(bp)).size() - DWORD
}

pub(crate) fn next(
  region: &Region,
  bp: usize,
) -> usize {
  bp + read_tag(region, header(bp)).size()
}

/// Steps back over the physical predecessor using its footer, which sits
/// right before our header.
pub(crate) fn prev(
  region: &Region,
  bp: usize,
) -> usize {
  bp - read_tag(region, bp - DWORD).size()
}

/// Writes `tag` into both the header and the footer of the block at `bp`.
///
/// The footer position is derived from `tag`, not from the old header.
pub(crate) fn write_tags(
  region: &mut Region,
  bp: usize,
  tag: Tag,
) {
  region.write_word(header(bp), tag.word());
  region.write_word(bp + tag.size() - DWORD, tag.word());
}

/// A decoded view of one block, as reported by
/// [`TagAllocator::blocks`](crate::TagAllocator::blocks).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Payload offset from the start of the managed region.
  pub offset: usize,
  /// Total size including header and footer.
  pub size: usize,
  pub allocated: bool,
}
