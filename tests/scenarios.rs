use std::{ptr::NonNull, slice};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rstest::rstest;
use tagalloc::{
  PoolError, TagAllocator,
  block::{DWORD, required_size},
};

/// Padding word, prologue and epilogue.
const SETUP: u32 = 4 * 4;

#[test]
fn test_single_block_pool() {
  let mut pool = TagAllocator::new(SETUP + 16 + 2 * 4).unwrap();

  assert!(pool.allocate(32).is_none());
  assert!(pool.allocate(17).is_none());

  let first = pool.allocate(16).unwrap();

  assert!(pool.allocate(1).is_none());

  pool.release(first.as_ptr());

  let second = pool.allocate(16).unwrap();
  assert_eq!(second, first);

  pool.release(second.as_ptr());
  assert_eq!(pool.check(), Ok(()));
}

#[test]
fn test_two_block_pool() {
  let mut pool = TagAllocator::new(SETUP + (16 + 2 * 4) * 2).unwrap();

  assert!(pool.allocate(41).is_none());

  let large = pool.allocate(40).unwrap();
  assert!(pool.allocate(1).is_none());

  pool.release(large.as_ptr());

  let a = pool.allocate(16).unwrap();
  assert!(pool.allocate(17).is_none());
  let b = pool.allocate(16).unwrap();

  pool.release(a.as_ptr());
  pool.release(b.as_ptr());

  // Both halves merged back into one 48 byte block.
  assert_eq!(pool.blocks().count(), 1);
  assert_eq!(pool.allocate(40), Some(large));
  assert_eq!(pool.check(), Ok(()));
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(SETUP - 1)]
fn test_pool_too_small(#[case] capacity: u32) {
  assert_eq!(
    TagAllocator::new(capacity).err(),
    Some(PoolError::PoolTooSmall { capacity })
  );
}

#[rstest]
#[case(SETUP, 1)]
#[case(SETUP + 8, 1)]
#[case(SETUP + 64, 57)]
#[case(SETUP + 64, u32::MAX)]
fn test_capacity_exhausted(
  #[case] capacity: u32,
  #[case] size: u32,
) {
  let mut pool = TagAllocator::new(capacity).unwrap();

  assert!(pool.allocate(size).is_none());
  assert_eq!(pool.high_water_mark(), SETUP as usize);
}

#[test]
fn test_payload_survives_neighbour_traffic() {
  let mut pool = TagAllocator::new(1024).unwrap();

  let keep = pool.allocate(100).unwrap();
  unsafe { keep.as_ptr().write_bytes(0x5A, 100) };

  for round in 0..16u32 {
    let a = pool.allocate(round + 1).unwrap();
    let b = pool.allocate(3 * round + 9).unwrap();
    unsafe {
      a.as_ptr().write_bytes(0xFF, round as usize + 1);
      b.as_ptr().write_bytes(0x00, 3 * round as usize + 9);
    }
    pool.release(a.as_ptr());
    pool.release(b.as_ptr());
  }

  let bytes = unsafe { slice::from_raw_parts(keep.as_ptr(), 100) };
  assert!(bytes.iter().all(|&b| b == 0x5A));
  assert_eq!(pool.check(), Ok(()));
}

struct Live {
  ptr: NonNull<u8>,
  len: usize,
  fill: u8,
}

#[rstest]
fn test_random_workload(
  #[values(1, 7, 42, 1337)] seed: u64,
  #[values(64, 1024, 8192)] capacity: u32,
) {
  let mut rng = StdRng::seed_from_u64(seed);
  let mut pool = TagAllocator::new(capacity).unwrap();
  let mut live: Vec<Live> = Vec::new();

  for step in 0..2000 {
    if live.is_empty() || rng.gen_bool(0.6) {
      let size = rng.gen_range(1..=capacity / 4);
      let needed = required_size(size).unwrap();

      match pool.allocate(size) {
        Some(ptr) => {
          assert_eq!(ptr.as_ptr() as usize % DWORD, 0, "step {}", step);

          let fill = rng.r#gen::<u8>();
          unsafe { ptr.as_ptr().write_bytes(fill, size as usize) };

          live.push(Live {
            ptr,
            len: size as usize,
            fill,
          });
        }
        None => {
          assert!(
            pool.blocks().all(|b| b.allocated || b.size < needed),
            "step {}: a free block could have served {} bytes",
            step,
            needed
          );
          assert!(pool.capacity() - pool.high_water_mark() < needed, "step {}", step);
        }
      }
    } else {
      let victim = live.swap_remove(rng.gen_range(0..live.len()));

      let bytes = unsafe { slice::from_raw_parts(victim.ptr.as_ptr(), victim.len) };
      assert!(bytes.iter().all(|&b| b == victim.fill), "step {}", step);

      pool.release(victim.ptr.as_ptr());
    }

    if let Err(err) = pool.check() {
      panic!("step {}: {}", step, err);
    }

    live.sort_by_key(|l| l.ptr.as_ptr() as usize);
    for pair in live.windows(2) {
      let end = pair[0].ptr.as_ptr() as usize + pair[0].len;
      assert!(end <= pair[1].ptr.as_ptr() as usize, "step {}: overlap", step);
    }

    let used: usize = pool.blocks().filter(|b| b.allocated).map(|b| b.size).sum();
    assert!(used + SETUP as usize <= pool.capacity());
  }

  for victim in live.drain(..) {
    pool.release(victim.ptr.as_ptr());
  }

  let blocks: Vec<_> = pool.blocks().collect();
  assert!(blocks.len() <= 1);
  if let Some(block) = blocks.first() {
    assert!(!block.allocated);
    assert_eq!(block.size, pool.high_water_mark() - SETUP as usize);
  }
}
