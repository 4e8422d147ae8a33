//! Process-wide Fibonacci oracle backing the balancing rule.
//!
//! A rope is balanced along an axis when `fib(depth + 2)` does not exceed
//! its edge length, which bounds depth logarithmically in the edge. The
//! table is filled once per process; concurrent readers observe the same
//! snapshot.

use std::sync::OnceLock;

/// Upper bound on rope depth. Fibonacci numbers up to `MAX_DEPTH + 2` stay
/// comfortably inside `u64`.
pub(crate) const MAX_DEPTH: usize = 45;

static TABLE: OnceLock<[u64; MAX_DEPTH + 3]> = OnceLock::new();

/// The `n`-th Fibonacci number, `fib(0) = 0`, `fib(1) = 1`. Panics if `n`
/// exceeds `MAX_DEPTH + 2`, which no balance check can produce.
pub(crate) fn fib(n: usize) -> u64 {
  let table = TABLE.get_or_init(|| {
    let mut t = [0u64; MAX_DEPTH + 3];
    t[1] = 1;
    for i in 2..t.len() {
      t[i] = t[i - 1] + t[i - 2];
    }
    t
  });
  table[n]
}

#[cfg(test)]
mod api {
  use super::*;
  #[test]
  fn small_values() {
    assert_eq!(0, fib(0));
    assert_eq!(1, fib(1));
    assert_eq!(1, fib(2));
    assert_eq!(2, fib(3));
    assert_eq!(3, fib(4));
    assert_eq!(5, fib(5));
    assert_eq!(55, fib(10));
  }
  #[test]
  fn monotone_to_table_end() {
    for n in 2..=MAX_DEPTH + 2 {
      assert!(fib(n) >= fib(n - 1));
    }
  }
}
