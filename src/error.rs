use thiserror::Error;

/// Reasons a [`TagAllocator`](crate::TagAllocator) cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
  /// The capacity cannot hold the padding word, prologue and epilogue.
  #[error("pool capacity of {capacity} bytes is too small for the setup span")]
  PoolTooSmall { capacity: u32 },

  /// The backing buffer could not be obtained from the system allocator.
  #[error("unable to obtain a {capacity} byte backing buffer")]
  OutOfMemory { capacity: u32 },
}

/// A broken heap invariant found by [`TagAllocator::check`](crate::TagAllocator::check).
///
/// Offsets are payload offsets from the start of the managed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("prologue block is damaged")]
  BadPrologue,

  #[error("block at {offset} has header {header:#x} but footer {footer:#x}")]
  TagMismatch { offset: usize, header: u32, footer: u32 },

  #[error("block at {offset} has invalid size {size}")]
  BadSize { offset: usize, size: usize },

  #[error("block at {offset} is not double-word aligned")]
  Misaligned { offset: usize },

  #[error("free blocks at {offset} and {next} were not coalesced")]
  Uncoalesced { offset: usize, next: usize },

  #[error("block at {offset} runs past the high-water mark")]
  Overrun { offset: usize },

  #[error("epilogue at {offset} is not an allocated zero-size tag")]
  BadEpilogue { offset: usize },
}
