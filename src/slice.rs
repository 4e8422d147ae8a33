/*!
The tile layer: dense rectangular buffers and windowed views onto them.

An [`ArraySlice`] is the element storage unit at the leaves of a rope. It
pairs a shared, reference-counted buffer with an origin and a shape, so
sub-slicing never copies elements. Buffers are frozen after publication;
the only writer of a buffer is the in-flight operation that owns its
[`Target`](crate::target::Target) windows.
*/

use std::cell::UnsafeCell;
use std::sync::Arc;

/// A contiguous row-major rectangle of cells.
///
/// Cells sit behind `UnsafeCell` so that a bulk operation can fill disjoint
/// windows of one allocation while slices over already-written windows are
/// being handed out. Reads and writes never address the same cell while the
/// buffer is live in an operation; once the operation returns, the buffer is
/// only ever read.
pub(crate) struct RawBuffer<T> {
  cells: Box<[UnsafeCell<T>]>,
  rows: usize,
  cols: usize,
}

// Writers only exist inside one in-flight bulk operation and address
// windows disjoint from every window a reader can hold.
unsafe impl<T: Send + Sync> Sync for RawBuffer<T> {}

impl<T> RawBuffer<T> {
  pub(crate) fn from_vec(rows: usize, cols: usize, cells: Vec<T>) -> Self {
    debug_assert_eq!(rows * cols, cells.len());
    RawBuffer {
      cells: cells.into_iter().map(UnsafeCell::new).collect(),
      rows,
      cols,
    }
  }
  pub(crate) fn rows(&self) -> usize {
    self.rows
  }
  pub(crate) fn cols(&self) -> usize {
    self.cols
  }
  pub(crate) fn get(&self, i: usize, j: usize) -> &T {
    debug_assert!(i < self.rows && j < self.cols);
    unsafe { &*self.cells[i * self.cols + j].get() }
  }
  /// # Safety
  /// The caller must be the only live writer of cell `(i, j)` and no reader
  /// may hold a window containing it.
  pub(crate) unsafe fn write(&self, i: usize, j: usize, value: T) {
    debug_assert!(i < self.rows && j < self.cols);
    *self.cells[i * self.cols + j].get() = value;
  }
}
impl<T: Clone> RawBuffer<T> {
  pub(crate) fn with_fill(rows: usize, cols: usize, fill: T) -> Self {
    RawBuffer::from_vec(rows, cols, vec![fill; rows * cols])
  }
}
impl<T: std::fmt::Debug> std::fmt::Debug for RawBuffer<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "RawBuffer({}x{})", self.rows, self.cols)
  }
}

/// A windowed view onto a [`RawBuffer`]: origin `(i0, j0)` plus shape
/// `(rows, cols)`. The window always fits inside the buffer.
///
/// Slices are cheap to clone and may share their buffer with other slices;
/// the element contents they view are immutable.
pub(crate) struct ArraySlice<T> {
  buf: Arc<RawBuffer<T>>,
  i0: usize,
  j0: usize,
  rows: usize,
  cols: usize,
}
impl<T> Clone for ArraySlice<T> {
  fn clone(&self) -> Self {
    ArraySlice {
      buf: Arc::clone(&self.buf),
      i0: self.i0,
      j0: self.j0,
      rows: self.rows,
      cols: self.cols,
    }
  }
}
impl<T> ArraySlice<T> {
  /// A slice covering an entire freshly-built buffer.
  pub(crate) fn full(buf: Arc<RawBuffer<T>>) -> Self {
    let (rows, cols) = (buf.rows(), buf.cols());
    ArraySlice {
      buf,
      i0: 0,
      j0: 0,
      rows,
      cols,
    }
  }
  /// A window onto a shared buffer. Used when freezing target regions.
  pub(crate) fn window(buf: Arc<RawBuffer<T>>, i0: usize, j0: usize, rows: usize, cols: usize) -> Self {
    debug_assert!(i0 + rows <= buf.rows() && j0 + cols <= buf.cols());
    ArraySlice {
      buf,
      i0,
      j0,
      rows,
      cols,
    }
  }
  pub(crate) fn rows(&self) -> usize {
    self.rows
  }
  pub(crate) fn cols(&self) -> usize {
    self.cols
  }
  pub(crate) fn get(&self, i: usize, j: usize) -> &T {
    debug_assert!(i < self.rows && j < self.cols);
    self.buf.get(self.i0 + i, self.j0 + j)
  }
  /// Narrows the window to `h x w` cells starting at `(i, j)`. The new
  /// window must fit inside the old one; callers clamp beforehand.
  pub(crate) fn slice(&self, i: usize, j: usize, h: usize, w: usize) -> ArraySlice<T> {
    debug_assert!(i + h <= self.rows && j + w <= self.cols);
    ArraySlice {
      buf: Arc::clone(&self.buf),
      i0: self.i0 + i,
      j0: self.j0 + j,
      rows: h,
      cols: w,
    }
  }
  /// Iterates the window's cells in row-major order.
  pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
    (0..self.rows).flat_map(move |i| (0..self.cols).map(move |j| self.get(i, j)))
  }
}
impl<T: Clone> ArraySlice<T> {
  /// Builds a fresh `rows x cols` tile from a generator called in row-major
  /// order.
  pub(crate) fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> T) -> Self {
    let mut cells = Vec::with_capacity(rows * cols);
    for i in 0..rows {
      for j in 0..cols {
        cells.push(f(i, j));
      }
    }
    ArraySlice::full(Arc::new(RawBuffer::from_vec(rows, cols, cells)))
  }
  pub(crate) fn from_vec(rows: usize, cols: usize, cells: Vec<T>) -> Self {
    ArraySlice::full(Arc::new(RawBuffer::from_vec(rows, cols, cells)))
  }
  pub(crate) fn singleton(value: T) -> Self {
    ArraySlice::from_vec(1, 1, vec![value])
  }
  /// Returns a copy of the tile with the cell at `(i, j)` replaced. Only
  /// the window is copied, never the whole underlying buffer.
  pub(crate) fn with_cell(&self, i: usize, j: usize, value: T) -> ArraySlice<T> {
    debug_assert!(i < self.rows && j < self.cols);
    let out = ArraySlice::from_fn(self.rows, self.cols, |r, c| self.get(r, c).clone());
    unsafe { out.buf.write(i, j, value) };
    out
  }
  /// Concatenates two tiles side by side into one fresh buffer. Rows must
  /// agree.
  pub(crate) fn hcat(&self, other: &ArraySlice<T>) -> ArraySlice<T> {
    debug_assert_eq!(self.rows, other.rows);
    ArraySlice::from_fn(self.rows, self.cols + other.cols, |i, j| {
      if j < self.cols {
        self.get(i, j).clone()
      } else {
        other.get(i, j - self.cols).clone()
      }
    })
  }
  /// Concatenates two tiles one above the other into one fresh buffer.
  /// Columns must agree.
  pub(crate) fn vcat(&self, other: &ArraySlice<T>) -> ArraySlice<T> {
    debug_assert_eq!(self.cols, other.cols);
    ArraySlice::from_fn(self.rows + other.rows, self.cols, |i, j| {
      if i < self.rows {
        self.get(i, j).clone()
      } else {
        other.get(i - self.rows, j).clone()
      }
    })
  }
  pub(crate) fn map<U: Clone>(&self, f: impl Fn(&T) -> U) -> ArraySlice<U> {
    ArraySlice::from_fn(self.rows, self.cols, |i, j| f(self.get(i, j)))
  }
  pub(crate) fn map2<U: Clone, V: Clone>(
    &self,
    other: &ArraySlice<U>,
    f: impl Fn(&T, &U) -> V,
  ) -> ArraySlice<V> {
    debug_assert!(self.rows == other.rows && self.cols == other.cols);
    ArraySlice::from_fn(self.rows, self.cols, |i, j| f(self.get(i, j), other.get(i, j)))
  }
  pub(crate) fn fold<A>(&self, init: A, mut f: impl FnMut(A, &T) -> A) -> A {
    let mut acc = init;
    for i in 0..self.rows {
      for j in 0..self.cols {
        acc = f(acc, self.get(i, j));
      }
    }
    acc
  }
  /// Maps every cell with `g` and folds each row with `f`, producing a
  /// `rows x 1` column tile of the per-row results.
  pub(crate) fn row_folds<U: Clone>(
    &self,
    g: impl Fn(&T) -> U,
    f: impl Fn(&U, &U) -> U,
  ) -> ArraySlice<U> {
    debug_assert!(self.cols > 0);
    ArraySlice::from_fn(self.rows, 1, |i, _| {
      let mut acc = g(self.get(i, 0));
      for j in 1..self.cols {
        acc = f(&acc, &g(self.get(i, j)));
      }
      acc
    })
  }
  /// Maps every cell with `g` and folds each column with `f`, producing a
  /// `1 x cols` row tile of the per-column results.
  pub(crate) fn col_folds<U: Clone>(
    &self,
    g: impl Fn(&T) -> U,
    f: impl Fn(&U, &U) -> U,
  ) -> ArraySlice<U> {
    debug_assert!(self.rows > 0);
    ArraySlice::from_fn(1, self.cols, |_, j| {
      let mut acc = g(self.get(0, j));
      for i in 1..self.rows {
        acc = f(&acc, &g(self.get(i, j)));
      }
      acc
    })
  }
  /// Mirrors the tile along the vertical axis: each row is reversed.
  pub(crate) fn hrev(&self) -> ArraySlice<T> {
    ArraySlice::from_fn(self.rows, self.cols, |i, j| {
      self.get(i, self.cols - 1 - j).clone()
    })
  }
  /// Mirrors the tile along the horizontal axis: the row order is reversed.
  pub(crate) fn vrev(&self) -> ArraySlice<T> {
    ArraySlice::from_fn(self.rows, self.cols, |i, j| {
      self.get(self.rows - 1 - i, j).clone()
    })
  }
  pub(crate) fn transpose(&self) -> ArraySlice<T> {
    ArraySlice::from_fn(self.cols, self.rows, |i, j| self.get(j, i).clone())
  }
  /// Keeps the cells of a single-row tile that satisfy `p`, preserving
  /// order. May produce an empty window.
  pub(crate) fn filter_row(&self, p: impl Fn(&T) -> bool) -> ArraySlice<T> {
    debug_assert_eq!(1, self.rows);
    let kept: Vec<T> = self.iter().filter(|v| p(*v)).cloned().collect();
    let w = kept.len();
    ArraySlice::from_vec(if w == 0 { 0 } else { 1 }, w, kept)
  }
  /// Keeps the cells of a single-column tile that satisfy `p`, preserving
  /// order. May produce an empty window.
  pub(crate) fn filter_col(&self, p: impl Fn(&T) -> bool) -> ArraySlice<T> {
    debug_assert_eq!(1, self.cols);
    let kept: Vec<T> = self.iter().filter(|v| p(*v)).cloned().collect();
    let h = kept.len();
    ArraySlice::from_vec(h, if h == 0 { 0 } else { 1 }, kept)
  }
  /// Produces the window's contents as a flat row-major vec.
  pub(crate) fn to_vec(&self) -> Vec<T> {
    self.iter().cloned().collect()
  }
}
impl<T: std::fmt::Debug> std::fmt::Debug for ArraySlice<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut list = f.debug_list();
    for i in 0..self.rows {
      list.entry(&(0..self.cols).map(|j| self.get(i, j)).collect::<Vec<_>>());
    }
    list.finish()
  }
}
impl<T: PartialEq> PartialEq for ArraySlice<T> {
  fn eq(&self, other: &Self) -> bool {
    self.rows == other.rows
    && self.cols == other.cols
    && self.iter().zip(other.iter()).all(|(a, b)| a == b)
  }
}

/* Serde */
// Tiles cross the wire as (rows, cols, row-major cells); the interior
// mutability wrapper and any sharing are reconstructed as one fresh
// buffer per tile.
#[cfg(feature = "serde")]
impl<T: Clone + serde::Serialize> serde::Serialize for ArraySlice<T> {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serde::Serialize::serialize(&(self.rows, self.cols, self.to_vec()), serializer)
  }
}
#[cfg(feature = "serde")]
impl<'de, T: Clone + serde::Deserialize<'de>> serde::Deserialize<'de> for ArraySlice<T> {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let (rows, cols, cells): (usize, usize, Vec<T>) =
      serde::Deserialize::deserialize(deserializer)?;
    if rows * cols != cells.len() {
      return Err(serde::de::Error::invalid_length(cells.len(), &"rows * cols cells"));
    }
    Ok(ArraySlice::from_vec(rows, cols, cells))
  }
}

#[cfg(test)]
mod api {
  use super::*;
  fn counting(rows: usize, cols: usize) -> ArraySlice<usize> {
    ArraySlice::from_fn(rows, cols, |i, j| i * cols + j)
  }
  #[test]
  fn from_fn_get() {
    let s = counting(3, 4);
    assert_eq!(3, s.rows());
    assert_eq!(4, s.cols());
    assert_eq!(&0, s.get(0, 0));
    assert_eq!(&7, s.get(1, 3));
    assert_eq!(&11, s.get(2, 3));
  }
  #[test]
  fn slice_shares_buffer() {
    let s = counting(4, 4);
    let sub = s.slice(1, 2, 2, 2);
    assert_eq!(2, sub.rows());
    assert_eq!(2, sub.cols());
    assert_eq!(&6, sub.get(0, 0));
    assert_eq!(&11, sub.get(1, 1));
  }
  #[test]
  fn with_cell_copies_window_only() {
    let s = counting(2, 2);
    let t = s.with_cell(0, 1, 42);
    assert_eq!(&1, s.get(0, 1));
    assert_eq!(&42, t.get(0, 1));
    assert_eq!(&3, t.get(1, 1));
  }
  #[test]
  fn hcat_vcat() {
    let a = counting(2, 2);
    let b = ArraySlice::from_fn(2, 1, |i, _| 100 + i);
    let h = a.hcat(&b);
    assert_eq!(vec![0, 1, 100, 2, 3, 101], h.to_vec());
    let c = ArraySlice::from_fn(1, 2, |_, j| 200 + j);
    let v = a.vcat(&c);
    assert_eq!(vec![0, 1, 2, 3, 200, 201], v.to_vec());
  }
  #[test]
  fn map_fold() {
    let s = counting(2, 3);
    let doubled = s.map(|v| v * 2);
    assert_eq!(vec![0, 2, 4, 6, 8, 10], doubled.to_vec());
    assert_eq!(15, s.fold(0, |a, v| a + v));
  }
  #[test]
  fn map2_pairs_cells() {
    let a = counting(2, 2);
    let b = a.map(|v| v * 10);
    let sum = a.map2(&b, |x, y| x + y);
    assert_eq!(vec![0, 11, 22, 33], sum.to_vec());
  }
  #[test]
  fn row_folds_col_folds() {
    let s = counting(2, 3);
    let rs = s.row_folds(|v| *v, |a, b| a + b);
    assert_eq!(vec![3, 12], rs.to_vec());
    let cs = s.col_folds(|v| *v, |a, b| a + b);
    assert_eq!(vec![3, 5, 7], cs.to_vec());
  }
  #[test]
  fn hrev_vrev_transpose() {
    let s = counting(2, 3);
    assert_eq!(vec![2, 1, 0, 5, 4, 3], s.hrev().to_vec());
    assert_eq!(vec![3, 4, 5, 0, 1, 2], s.vrev().to_vec());
    let t = s.transpose();
    assert_eq!(3, t.rows());
    assert_eq!(2, t.cols());
    assert_eq!(vec![0, 3, 1, 4, 2, 5], t.to_vec());
  }
  #[test]
  fn filter_row_0() {
    let s = ArraySlice::from_fn(1, 6, |_, j| j);
    let kept = s.filter_row(|v| v % 2 == 0);
    assert_eq!(1, kept.rows());
    assert_eq!(vec![0, 2, 4], kept.to_vec());
  }
  #[test]
  fn filter_row_empty() {
    let s = ArraySlice::from_fn(1, 3, |_, j| j);
    let kept = s.filter_row(|_| false);
    assert_eq!(0, kept.rows());
    assert_eq!(0, kept.cols());
  }
  #[test]
  fn slice_of_slice_composes() {
    let s = counting(6, 6);
    let outer = s.slice(1, 1, 4, 4);
    let inner = outer.slice(1, 2, 2, 2);
    assert_eq!(s.slice(2, 3, 2, 2).to_vec(), inner.to_vec());
  }
}
