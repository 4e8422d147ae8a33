use crate::rope::{Node, QuadRope};
use crate::slice::ArraySlice;

/// A run of horizontally adjacent cells inside one leaf or sparse region.
///
/// The cell iterator resolves one run at a time instead of descending the
/// tree for every cell.
enum Run<'a, T> {
  Exhausted,
  Dense {
    slice: &'a ArraySlice<T>,
    i: usize,
    j: usize,
    remaining: usize,
  },
  Constant {
    value: &'a T,
    remaining: usize,
  },
}
impl<'a, T> Run<'a, T> {
  fn is_exhausted(&self) -> bool {
    match self {
      Run::Exhausted => true,
      Run::Dense { remaining, .. } | Run::Constant { remaining, .. } => *remaining == 0,
    }
  }
  fn clamp(&mut self, limit: usize) {
    match self {
      Run::Exhausted => {}
      Run::Dense { remaining, .. } | Run::Constant { remaining, .. } => {
        *remaining = (*remaining).min(limit);
      }
    }
  }
  fn take_one(&mut self) -> &'a T {
    match self {
      Run::Exhausted => unreachable!("runs are refilled before use"),
      Run::Dense {
        slice, i, j, remaining,
      } => {
        let s: &'a ArraySlice<T> = *slice;
        let v = s.get(*i, *j);
        *j += 1;
        *remaining -= 1;
        v
      }
      Run::Constant { value, remaining } => {
        *remaining -= 1;
        let v: &'a T = *value;
        v
      }
    }
  }
}

fn resolve<'a, T>(node: &'a Node<T>, i: usize, j: usize) -> Run<'a, T> {
  match node {
    Node::Leaf(s) => Run::Dense {
      slice: s,
      i,
      j,
      remaining: s.cols() - j,
    },
    Node::Sparse { cols, value, .. } => Run::Constant {
      value,
      remaining: cols - j,
    },
    Node::HCat { left, right, .. } => {
      if j < left.cols() {
        resolve(left, i, j)
      } else {
        resolve(right, i, j - left.cols())
      }
    }
    Node::VCat { top, bottom, .. } => {
      if i < top.rows() {
        resolve(top, i, j)
      } else {
        resolve(bottom, i - top.rows(), j)
      }
    }
    Node::Slice {
      i: si, j: sj, cols, inner, ..
    } => {
      let mut run = resolve(inner, i + si, j + sj);
      run.clamp(cols - j);
      run
    }
    Node::Empty => unreachable!("the empty rope has no cells to resolve"),
  }
}

/// An iterator over every cell of a rope in row-major reading order.
///
/// A sparse `h x w` region yields its value exactly `h * w` times; callers
/// with side effects observe that multiplicity.
pub struct Cells<'a, T> {
  root: &'a Node<T>,
  rows: usize,
  cols: usize,
  i: usize,
  j: usize,
  run: Run<'a, T>,
}
impl<'a, T> Cells<'a, T> {
  fn new(rope: &'a QuadRope<T>) -> Self {
    Cells {
      root: rope.node().as_ref(),
      rows: rope.rows(),
      cols: rope.cols(),
      i: 0,
      j: 0,
      run: Run::Exhausted,
    }
  }
}
impl<'a, T> Iterator for Cells<'a, T> {
  type Item = &'a T;
  fn next(&mut self) -> Option<&'a T> {
    if self.i >= self.rows {
      return None;
    }
    if self.run.is_exhausted() {
      self.run = resolve(self.root, self.i, self.j);
    }
    let v = self.run.take_one();
    self.j += 1;
    if self.j == self.cols {
      self.j = 0;
      self.i += 1;
      self.run = Run::Exhausted;
    }
    Some(v)
  }
  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.rows * self.cols - (self.i * self.cols + self.j);
    (left, Some(left))
  }
}
impl<'a, T> ExactSizeIterator for Cells<'a, T> {}
impl<'a, T> std::fmt::Debug for Cells<'a, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Cells({}x{} @ ({}, {}))", self.rows, self.cols, self.i, self.j)
  }
}

/// An iterator over the rows of a rope, each presented as a `1 x cols`
/// rope sharing structure with the source.
pub struct Rows<T> {
  rope: QuadRope<T>,
  i: usize,
}
impl<T: Clone> Iterator for Rows<T> {
  type Item = QuadRope<T>;
  fn next(&mut self) -> Option<QuadRope<T>> {
    if self.i >= self.rope.rows() {
      return None;
    }
    let row = self.rope.row(self.i);
    self.i += 1;
    Some(row)
  }
  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.rope.rows() - self.i;
    (left, Some(left))
  }
}
impl<T: Clone> ExactSizeIterator for Rows<T> {}
impl<T> std::fmt::Debug for Rows<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Rows(@ {})", self.i)
  }
}

impl<T> QuadRope<T> {
  /// Iterates every cell in row-major reading order.
  ///
  /// Sparse regions yield their value once per covered cell.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(2, 3, |i, j| i * 3 + j);
  /// assert_eq!(vec![0, 1, 2, 3, 4, 5], r.cells().copied().collect::<Vec<_>>());
  /// ```
  pub fn cells(&self) -> Cells<'_, T> {
    Cells::new(self)
  }
}
impl<T: Clone> QuadRope<T> {
  /// Iterates the rows of the rope as `1 x cols` slices.
  pub fn row_iter(&self) -> Rows<T> {
    Rows {
      rope: self.clone(),
      i: 0,
    }
  }
}
