//! # tagalloc - A Boundary-Tag Memory Pool
//!
//! This crate provides a first-fit allocator that serves variable-size
//! requests out of one fixed-capacity byte region, independent of the global
//! allocator once the region has been obtained.
//!
//! ## Overview
//!
//! All bookkeeping lives inside the managed bytes. Every block starts with a
//! header word and ends with an identical footer word, each packing the block
//! size together with an "allocated" bit:
//!
//! ```text
//!   Managed Region:
//!
//!   ┌─────┬──────────┬───────────────┬──────────┬─────────┬──────────┬─────────────────┐
//!   │ pad │ prologue │  A (alloc)    │ B (free) │ C alloc │ epilogue │ untouched ...   │
//!   └─────┴──────────┴───────────────┴──────────┴─────────┴──────────┴─────────────────┘
//!                                                                    ▲                 ▲
//!                                                                    │                 │
//!                                                             High-water mark     Capacity
//! ```
//!
//! Free blocks are found by walking the tags ("implicit free list"); the
//! footer lets a block find its predecessor, so releasing a block merges it
//! with free neighbours on both sides in O(1).
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Rounding macro (align!)
//!   ├── block      - Tag words and block navigation
//!   ├── error      - Construction and heap-check errors
//!   ├── pool       - TagAllocator implementation
//!   └── region     - Fixed buffer with a growable high-water mark
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::TagAllocator;
//!
//! let mut pool = TagAllocator::new(4 * 4 + 16 + 2 * 4).unwrap();
//!
//! let ptr = pool.allocate(16).unwrap();
//!
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 16);
//!     assert_eq!(*ptr.as_ptr().add(15), 0xAB);
//! }
//!
//! // The pool is full now.
//! assert!(pool.allocate(1).is_none());
//!
//! pool.release(ptr.as_ptr());
//! assert!(pool.allocate(16).is_some());
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   allocate(n):
//!
//!   needed = max(16, round8(n) + 8)
//!        │
//!        ▼
//!   first-fit walk ──hit──► split if the rest holds ≥ 16 bytes ──► pointer
//!        │
//!       miss
//!        ▼
//!   grow region by `needed` ──fail──► None
//!        │
//!        ▼
//!   format new free block, new epilogue, merge with free predecessor
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **No shrinking**: The high-water mark only moves forward
//! - **No realloc**: Blocks are never resized in place
//!
//! ## Safety
//!
//! Metadata is read and written through bounds-checked offsets, so the
//! allocator itself needs no `unsafe` from callers. Writing to the returned
//! pointers is `unsafe` as usual, and a pointer must not be used after it
//! has been released or after the allocator has been dropped.

pub mod align;
pub mod block;
mod error;
mod pool;
mod region;

pub use block::BlockInfo;
pub use error::{HeapError, PoolError};
pub use pool::{Blocks, TagAllocator};
