/// Rounds `value` up to the next multiple of `unit`.
///
/// `unit` must be a power of two and both operands must share the same
/// integer type.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align;
///
/// assert_eq!(align!(13usize, 8), 16);
/// assert_eq!(align!(16u64, 8), 16);
/// assert_eq!(align!(1u32, 4), 4);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr, $unit:expr) => {
    ($value + $unit - 1) & !($unit - 1)
  };
}

#[cfg(test)]
mod tests {
  use crate::block::DWORD;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (DWORD * i + 1)..=(DWORD * (i + 1));

      let expected_alignment = DWORD * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size, DWORD));
      }
    }
  }

  #[test]
  fn test_align_keeps_multiples() {
    assert_eq!(align!(0usize, DWORD), 0);
    assert_eq!(align!(24u64, 8), 24);
    assert_eq!(align!(4096usize, 4096), 4096);
  }
}
