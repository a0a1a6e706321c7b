use std::ptr::NonNull;

use log::LevelFilter;
use simple_logger::SimpleLogger;
use tagalloc::{PoolError, TagAllocator};

/// Prints every block between the prologue and the epilogue.
/// Handy to watch splitting and coalescing happen step by step.
fn print_blocks(
  label: &str,
  pool: &TagAllocator,
) {
  println!(
    "[{}] high-water mark = {} / {} bytes",
    label,
    pool.high_water_mark(),
    pool.capacity()
  );

  for block in pool.blocks() {
    println!(
      "    @{:<5} size = {:<5} {}",
      block.offset,
      block.size,
      if block.allocated { "allocated" } else { "free" }
    );
  }
}

fn print_alloc(
  size: u32,
  ptr: Option<NonNull<u8>>,
) {
  match ptr {
    Some(ptr) => println!("Allocated {} bytes, address = {:?}", size, ptr),
    None => println!("Allocating {} bytes failed: pool exhausted", size),
  }
}

fn main() -> Result<(), PoolError> {
  // Trace level so every split and merge shows up.
  SimpleLogger::new()
    .with_level(LevelFilter::Trace)
    .init()
    .ok();

  // Room for the setup span plus 256 bytes of blocks.
  let mut pool = TagAllocator::new(16 + 256)?;
  print_blocks("start", &pool);

  // --------------------------------------------------------------------
  // 1) Allocate space for a u32. Small requests get a 16 byte block.
  // --------------------------------------------------------------------
  let first = pool.allocate(4);
  println!("\n[1] Allocate u32");
  print_alloc(4, first);

  if let Some(ptr) = first {
    let ptr = ptr.as_ptr() as *mut u32;
    unsafe { ptr.write(0xDEADBEEF) };
    println!("[1] Value written = 0x{:X}", unsafe { ptr.read() });
  }
  print_blocks("1", &pool);

  // --------------------------------------------------------------------
  // 2) Allocate an array of u16 and a u64 next to it.
  // --------------------------------------------------------------------
  let second = pool.allocate(32);
  let third = pool.allocate(8);
  println!("\n[2] Allocate [u16; 16] and u64");
  print_alloc(32, second);
  print_alloc(8, third);
  print_blocks("2", &pool);

  // --------------------------------------------------------------------
  // 3) Release the array, then the u32 in front of it. The two freed
  //    blocks merge into one.
  // --------------------------------------------------------------------
  pool.release(second.map_or(std::ptr::null_mut(), |p| p.as_ptr()));
  pool.release(first.map_or(std::ptr::null_mut(), |p| p.as_ptr()));
  println!("\n[3] Release the array and the u32");
  print_blocks("3", &pool);

  // --------------------------------------------------------------------
  // 4) A small request reuses the merged block and splits it.
  // --------------------------------------------------------------------
  let fourth = pool.allocate(2);
  println!("\n[4] Allocate [u8; 2] (check reuse of freed block)");
  print_alloc(2, fourth);
  println!(
    "[4] fourth == first? {}",
    if fourth == first { "Yes, it reused the freed block" } else { "No" }
  );
  print_blocks("4", &pool);

  // --------------------------------------------------------------------
  // 5) Ask for more than the pool can ever hold.
  // --------------------------------------------------------------------
  println!("\n[5] Allocate 1 KiB");
  print_alloc(1024, pool.allocate(1024));

  if let Err(err) = pool.check() {
    println!("heap check failed: {}", err);
  }

  println!("\n[6] End of example. Dropping the pool frees its buffer.");

  Ok(())
}
