/*!
The target layer: a pre-allocated scratch rectangle with a moving write
cursor.

Bulk operations that materialize results thread a [`Target`] through their
recursion so that sibling sub-results land in adjacent regions of a single
buffer. Sibling recursive calls advance the cursor past one another's
windows, so concurrent writers always address disjoint cells. Once a window
is fully written it is frozen into an [`ArraySlice`] and from then on only
read.
*/

use std::sync::Arc;

use crate::slice::{ArraySlice, RawBuffer};

/// A write cursor into a shared scratch buffer.
///
/// Cloning a target is cheap; `offset` produces a handle whose window
/// starts further into the buffer. The handle never escapes the operation
/// that created it.
pub(crate) struct Target<T> {
  buf: Arc<RawBuffer<T>>,
  i: usize,
  j: usize,
}
impl<T> Clone for Target<T> {
  fn clone(&self) -> Self {
    Target {
      buf: Arc::clone(&self.buf),
      i: self.i,
      j: self.j,
    }
  }
}
impl<T: Clone> Target<T> {
  /// Allocates a `rows x cols` scratch buffer with the cursor at the
  /// origin. Every cell starts as a clone of `fill`; cells covered by the
  /// operation are overwritten before they are ever frozen.
  pub(crate) fn make(rows: usize, cols: usize, fill: T) -> Self {
    Target {
      buf: Arc::new(RawBuffer::with_fill(rows, cols, fill)),
      i: 0,
      j: 0,
    }
  }
}
impl<T> Target<T> {
  /// A handle onto the same buffer with the cursor advanced by
  /// `(di, dj)`.
  pub(crate) fn offset(&self, di: usize, dj: usize) -> Self {
    Target {
      buf: Arc::clone(&self.buf),
      i: self.i + di,
      j: self.j + dj,
    }
  }
  /// Writes one cell at `(i, j)` relative to the cursor.
  pub(crate) fn write(&self, i: usize, j: usize, value: T) {
    // The recursion hands each sibling a window past the cursor of every
    // other live sibling, and no slice over this window exists yet.
    unsafe { self.buf.write(self.i + i, self.j + j, value) }
  }
  /// Reads one cell at `(i, j)` relative to the cursor. Only used by scans,
  /// which read cells they have already written.
  pub(crate) fn read(&self, i: usize, j: usize) -> &T {
    self.buf.get(self.i + i, self.j + j)
  }
  /// Freezes the `rows x cols` window at the cursor into a slice. All of
  /// the window's cells must have been written.
  pub(crate) fn freeze(&self, rows: usize, cols: usize) -> ArraySlice<T> {
    ArraySlice::window(Arc::clone(&self.buf), self.i, self.j, rows, cols)
  }
}
impl<T> std::fmt::Debug for Target<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Target({}x{} @ ({}, {}))", self.buf.rows(), self.buf.cols(), self.i, self.j)
  }
}

/// A target that is allocated the first time a dense window asks for it.
///
/// Bulk operations over fully sparse ropes thread one of these through
/// their recursion and never touch an element buffer.
#[derive(Debug)]
pub(crate) struct LazyTarget<T> {
  rows: usize,
  cols: usize,
  tgt: Option<Target<T>>,
}
impl<T: Clone> LazyTarget<T> {
  pub(crate) fn new(rows: usize, cols: usize) -> Self {
    LazyTarget {
      rows,
      cols,
      tgt: None,
    }
  }
  /// A handle positioned at absolute `(i, j)`, allocating the buffer on
  /// first use. `fill` seeds the allocation; covered cells are overwritten
  /// before freezing.
  pub(crate) fn at(&mut self, i: usize, j: usize, fill: &T) -> Target<T> {
    let (rows, cols) = (self.rows, self.cols);
    let tgt = self
      .tgt
      .get_or_insert_with(|| Target::make(rows, cols, fill.clone()));
    tgt.offset(i, j)
  }
}

#[cfg(test)]
mod api {
  use super::*;
  #[test]
  fn write_freeze() {
    let tgt: Target<usize> = Target::make(2, 3, 0);
    for i in 0..2 {
      for j in 0..3 {
        tgt.write(i, j, i * 3 + j);
      }
    }
    let s = tgt.freeze(2, 3);
    assert_eq!(vec![0, 1, 2, 3, 4, 5], s.to_vec());
  }
  #[test]
  fn offset_windows_are_disjoint() {
    let tgt: Target<usize> = Target::make(2, 4, 0);
    let left = tgt.clone();
    let right = tgt.offset(0, 2);
    for i in 0..2 {
      for j in 0..2 {
        left.write(i, j, 1);
        right.write(i, j, 2);
      }
    }
    assert_eq!(vec![1, 1, 2, 2, 1, 1, 2, 2], tgt.freeze(2, 4).to_vec());
  }
  #[test]
  fn read_sees_prior_writes() {
    let tgt: Target<usize> = Target::make(1, 3, 0);
    tgt.write(0, 0, 7);
    tgt.write(0, 1, tgt.read(0, 0) + 1);
    assert_eq!(&8, tgt.read(0, 1));
  }
}
