/*!
Whole-rectangle operations: map, zip, reduce, scan and filter, each with
fast paths across sparse regions and a target buffer threaded through the
recursion so dense results land in one allocation.
*/

use std::sync::Arc;

use crate::error::QuadRopeError as Error;
use crate::rope::{
  empty_node, get_node, grid, hnode, leaf, materialize_node, slice_node, sparse_node, vnode, Node,
  QuadRope,
};
use crate::target::{LazyTarget, Target};

type Result<T> = std::result::Result<T, Error>;

/* Map */

pub(crate) fn map_node<T: Clone, U: Clone>(
  node: &Arc<Node<T>>,
  f: &impl Fn(&T) -> U,
  i: usize,
  j: usize,
  tgt: &mut LazyTarget<U>,
) -> Arc<Node<U>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Sparse { rows, cols, value } => sparse_node(*rows, *cols, f(value)),
    Node::Leaf(s) => {
      let (h, w) = (s.rows(), s.cols());
      let first = f(s.get(0, 0));
      let t = tgt.at(i, j, &first);
      for r in 0..h {
        for c in 0..w {
          t.write(r, c, f(s.get(r, c)));
        }
      }
      leaf(t.freeze(h, w))
    }
    Node::HCat { left, right, .. } => {
      let a = map_node(left, f, i, j, tgt);
      let b = map_node(right, f, i, j + left.cols(), tgt);
      hnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = map_node(top, f, i, j, tgt);
      let b = map_node(bottom, f, i + top.rows(), j, tgt);
      vnode(a, b)
    }
    Node::Slice { .. } => map_node(&materialize_node(node), f, i, j, tgt),
  }
}

/* Zip */

pub(crate) fn zip_node<T: Clone, U: Clone, V: Clone>(
  a: &Arc<Node<T>>,
  b: &Arc<Node<U>>,
  f: &impl Fn(&T, &U) -> V,
  i: usize,
  j: usize,
  tgt: &mut LazyTarget<V>,
) -> Arc<Node<V>> {
  debug_assert!(a.rows() == b.rows() && a.cols() == b.cols());
  match (&**a, &**b) {
    (Node::Empty, _) => empty_node(),
    (
      Node::Sparse {
        rows, cols, value: v1,
      },
      Node::Sparse { value: v2, .. },
    ) => sparse_node(*rows, *cols, f(v1, v2)),
    (Node::Sparse { value: v1, .. }, _) => map_node(b, &|x: &U| f(v1, x), i, j, tgt),
    (_, Node::Sparse { value: v2, .. }) => map_node(a, &|x: &T| f(x, v2), i, j, tgt),
    (Node::Leaf(s1), Node::Leaf(s2)) => {
      let (h, w) = (s1.rows(), s1.cols());
      let first = f(s1.get(0, 0), s2.get(0, 0));
      let t = tgt.at(i, j, &first);
      for r in 0..h {
        for c in 0..w {
          t.write(r, c, f(s1.get(r, c), s2.get(r, c)));
        }
      }
      leaf(t.freeze(h, w))
    }
    (
      Node::HCat {
        left: a1, right: a2, ..
      },
      Node::HCat {
        left: b1, right: b2, ..
      },
    ) if a1.cols() == b1.cols() => {
      let l = zip_node(a1, b1, f, i, j, tgt);
      let r = zip_node(a2, b2, f, i, j + a1.cols(), tgt);
      hnode(l, r)
    }
    (
      Node::VCat {
        top: a1, bottom: a2, ..
      },
      Node::VCat {
        top: b1, bottom: b2, ..
      },
    ) if a1.rows() == b1.rows() => {
      let t = zip_node(a1, b1, f, i, j, tgt);
      let u = zip_node(a2, b2, f, i + a1.rows(), j, tgt);
      vnode(t, u)
    }
    (Node::Slice { .. }, _) => zip_node(&materialize_node(a), b, f, i, j, tgt),
    (_, Node::Slice { .. }) => zip_node(a, &materialize_node(b), f, i, j, tgt),
    // Structures disagree: split the right rope along the left rope's
    // decomposition and recurse.
    (Node::HCat { left, right, .. }, _) => {
      let lw = left.cols();
      let b1 = slice_node(0, 0, b.rows(), lw, b);
      let b2 = slice_node(0, lw, b.rows(), b.cols() - lw, b);
      let l = zip_node(left, &b1, f, i, j, tgt);
      let r = zip_node(right, &b2, f, i, j + lw, tgt);
      hnode(l, r)
    }
    (Node::VCat { top, bottom, .. }, _) => {
      let th = top.rows();
      let b1 = slice_node(0, 0, th, b.cols(), b);
      let b2 = slice_node(th, 0, b.rows() - th, b.cols(), b);
      let t = zip_node(top, &b1, f, i, j, tgt);
      let u = zip_node(bottom, &b2, f, i + th, j, tgt);
      vnode(t, u)
    }
    (Node::Leaf(s1), _) => {
      let (h, w) = (s1.rows(), s1.cols());
      let first = f(s1.get(0, 0), get_node(b, 0, 0));
      let t = tgt.at(i, j, &first);
      for r in 0..h {
        for c in 0..w {
          t.write(r, c, f(s1.get(r, c), get_node(b, r, c)));
        }
      }
      leaf(t.freeze(h, w))
    }
  }
}

/* Reduce */

/// Folds `n` copies of one value under an associative `f` by binary
/// powering, in O(log n) applications.
pub(crate) fn pow_combine<U: Clone>(f: &impl Fn(&U, &U) -> U, value: U, n: usize) -> U {
  debug_assert!(n >= 1);
  let mut result: Option<U> = None;
  let mut base = value;
  let mut n = n;
  loop {
    if n & 1 == 1 {
      result = Some(match result {
        None => base.clone(),
        Some(acc) => f(&acc, &base),
      });
    }
    n >>= 1;
    if n == 0 {
      break;
    }
    base = f(&base, &base);
  }
  result.expect("n >= 1 always sets a result")
}
pub(crate) fn mapreduce_node<T: Clone, U: Clone>(
  node: &Arc<Node<T>>,
  g: &impl Fn(&T) -> U,
  f: &impl Fn(&U, &U) -> U,
) -> Option<U> {
  match &**node {
    Node::Empty => None,
    Node::Leaf(s) => s.fold(None, |acc, v| {
      Some(match acc {
        None => g(v),
        Some(a) => f(&a, &g(v)),
      })
    }),
    Node::Sparse { rows, cols, value } => Some(pow_combine(f, g(value), rows * cols)),
    Node::HCat { left, right, .. } => {
      let a = mapreduce_node(left, g, f);
      let b = mapreduce_node(right, g, f);
      combine_partial(f, a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = mapreduce_node(top, g, f);
      let b = mapreduce_node(bottom, g, f);
      combine_partial(f, a, b)
    }
    Node::Slice { .. } => mapreduce_node(&materialize_node(node), g, f),
  }
}
pub(crate) fn combine_partial<U>(
  f: &impl Fn(&U, &U) -> U,
  a: Option<U>,
  b: Option<U>,
) -> Option<U> {
  match (a, b) {
    (Some(x), Some(y)) => Some(f(&x, &y)),
    (Some(x), None) | (None, Some(x)) => Some(x),
    (None, None) => None,
  }
}

/* Row and column reductions */

pub(crate) fn hmapreduce_node<T: Clone, U: Clone>(
  node: &Arc<Node<T>>,
  g: &impl Fn(&T) -> U,
  f: &impl Fn(&U, &U) -> U,
) -> Arc<Node<U>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => leaf(s.row_folds(g, f)),
    Node::Sparse { rows, cols, value } => sparse_node(*rows, 1, pow_combine(f, g(value), *cols)),
    Node::VCat { top, bottom, .. } => {
      vnode(hmapreduce_node(top, g, f), hmapreduce_node(bottom, g, f))
    }
    Node::HCat { left, right, .. } => {
      // Per-row partials of the two sides combine pointwise.
      let a = hmapreduce_node(left, g, f);
      let b = hmapreduce_node(right, g, f);
      let mut tgt = LazyTarget::new(a.rows(), 1);
      zip_node(&a, &b, &|x: &U, y: &U| f(x, y), 0, 0, &mut tgt)
    }
    Node::Slice { .. } => hmapreduce_node(&materialize_node(node), g, f),
  }
}
pub(crate) fn vmapreduce_node<T: Clone, U: Clone>(
  node: &Arc<Node<T>>,
  g: &impl Fn(&T) -> U,
  f: &impl Fn(&U, &U) -> U,
) -> Arc<Node<U>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => leaf(s.col_folds(g, f)),
    Node::Sparse { rows, cols, value } => sparse_node(1, *cols, pow_combine(f, g(value), *rows)),
    Node::HCat { left, right, .. } => {
      hnode(vmapreduce_node(left, g, f), vmapreduce_node(right, g, f))
    }
    Node::VCat { top, bottom, .. } => {
      let a = vmapreduce_node(top, g, f);
      let b = vmapreduce_node(bottom, g, f);
      let mut tgt = LazyTarget::new(1, a.cols());
      zip_node(&a, &b, &|x: &U, y: &U| f(x, y), 0, 0, &mut tgt)
    }
    Node::Slice { .. } => vmapreduce_node(&materialize_node(node), g, f),
  }
}

/* Scan */

fn scan_window<T: Clone>(
  tgt: &Target<T>,
  i0: usize,
  j0: usize,
  h: usize,
  w: usize,
  input: &impl Fn(usize, usize) -> T,
  plus: &impl Fn(&T, &T) -> T,
  minus: &impl Fn(&T, &T) -> T,
  init: &impl Fn(isize, isize) -> T,
) {
  let out_at = |r: isize, c: isize| -> T {
    if r < 0 || c < 0 {
      init(r, c)
    } else {
      tgt.read(r as usize, c as usize).clone()
    }
  };
  for r in 0..h {
    for c in 0..w {
      let (ai, aj) = ((i0 + r) as isize, (j0 + c) as isize);
      let up = out_at(ai - 1, aj);
      let left = out_at(ai, aj - 1);
      let diag = out_at(ai - 1, aj - 1);
      let v = minus(&plus(&plus(&input(r, c), &up), &left), &diag);
      tgt.write(i0 + r, j0 + c, v);
    }
  }
}
fn scan_node<T: Clone>(
  node: &Arc<Node<T>>,
  i0: usize,
  j0: usize,
  tgt: &Target<T>,
  plus: &impl Fn(&T, &T) -> T,
  minus: &impl Fn(&T, &T) -> T,
  init: &impl Fn(isize, isize) -> T,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => {
      let (h, w) = (s.rows(), s.cols());
      scan_window(tgt, i0, j0, h, w, &|r, c| s.get(r, c).clone(), plus, minus, init);
      leaf(tgt.offset(i0, j0).freeze(h, w))
    }
    Node::Sparse { rows, cols, value } => {
      let (h, w) = (*rows, *cols);
      scan_window(tgt, i0, j0, h, w, &|_, _| value.clone(), plus, minus, init);
      grid(tgt.offset(i0, j0).freeze(h, w))
    }
    Node::HCat { left, right, .. } => {
      let a = scan_node(left, i0, j0, tgt, plus, minus, init);
      let b = scan_node(right, i0, j0 + left.cols(), tgt, plus, minus, init);
      hnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = scan_node(top, i0, j0, tgt, plus, minus, init);
      let b = scan_node(bottom, i0 + top.rows(), j0, tgt, plus, minus, init);
      vnode(a, b)
    }
    Node::Slice { .. } => scan_node(&materialize_node(node), i0, j0, tgt, plus, minus, init),
  }
}
fn hscan_node<T: Clone>(
  node: &Arc<Node<T>>,
  i0: usize,
  j0: usize,
  tgt: &Target<T>,
  f: &impl Fn(&T, &T) -> T,
  states: &impl Fn(usize) -> T,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => {
      hscan_window(tgt, i0, j0, s.rows(), s.cols(), &|r, c| s.get(r, c).clone(), f, states);
      leaf(tgt.offset(i0, j0).freeze(s.rows(), s.cols()))
    }
    Node::Sparse { rows, cols, value } => {
      hscan_window(tgt, i0, j0, *rows, *cols, &|_, _| value.clone(), f, states);
      grid(tgt.offset(i0, j0).freeze(*rows, *cols))
    }
    Node::HCat { left, right, .. } => {
      let a = hscan_node(left, i0, j0, tgt, f, states);
      let b = hscan_node(right, i0, j0 + left.cols(), tgt, f, states);
      hnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = hscan_node(top, i0, j0, tgt, f, states);
      let b = hscan_node(bottom, i0 + top.rows(), j0, tgt, f, states);
      vnode(a, b)
    }
    Node::Slice { .. } => hscan_node(&materialize_node(node), i0, j0, tgt, f, states),
  }
}
fn hscan_window<T: Clone>(
  tgt: &Target<T>,
  i0: usize,
  j0: usize,
  h: usize,
  w: usize,
  input: &impl Fn(usize, usize) -> T,
  f: &impl Fn(&T, &T) -> T,
  states: &impl Fn(usize) -> T,
) {
  for r in 0..h {
    for c in 0..w {
      let prev = if j0 + c == 0 {
        states(i0 + r)
      } else {
        tgt.read(i0 + r, j0 + c - 1).clone()
      };
      tgt.write(i0 + r, j0 + c, f(&prev, &input(r, c)));
    }
  }
}
fn vscan_node<T: Clone>(
  node: &Arc<Node<T>>,
  i0: usize,
  j0: usize,
  tgt: &Target<T>,
  f: &impl Fn(&T, &T) -> T,
  states: &impl Fn(usize) -> T,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => {
      vscan_window(tgt, i0, j0, s.rows(), s.cols(), &|r, c| s.get(r, c).clone(), f, states);
      leaf(tgt.offset(i0, j0).freeze(s.rows(), s.cols()))
    }
    Node::Sparse { rows, cols, value } => {
      vscan_window(tgt, i0, j0, *rows, *cols, &|_, _| value.clone(), f, states);
      grid(tgt.offset(i0, j0).freeze(*rows, *cols))
    }
    Node::HCat { left, right, .. } => {
      let a = vscan_node(left, i0, j0, tgt, f, states);
      let b = vscan_node(right, i0, j0 + left.cols(), tgt, f, states);
      hnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = vscan_node(top, i0, j0, tgt, f, states);
      let b = vscan_node(bottom, i0 + top.rows(), j0, tgt, f, states);
      vnode(a, b)
    }
    Node::Slice { .. } => vscan_node(&materialize_node(node), i0, j0, tgt, f, states),
  }
}
fn vscan_window<T: Clone>(
  tgt: &Target<T>,
  i0: usize,
  j0: usize,
  h: usize,
  w: usize,
  input: &impl Fn(usize, usize) -> T,
  f: &impl Fn(&T, &T) -> T,
  states: &impl Fn(usize) -> T,
) {
  for c in 0..w {
    for r in 0..h {
      let prev = if i0 + r == 0 {
        states(j0 + c)
      } else {
        tgt.read(i0 + r - 1, j0 + c).clone()
      };
      tgt.write(i0 + r, j0 + c, f(&prev, &input(r, c)));
    }
  }
}

/* Filter */

pub(crate) fn hfilter_node<T: Clone>(node: &Arc<Node<T>>, p: &impl Fn(&T) -> bool) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => leaf(s.filter_row(p)),
    Node::Sparse { value, .. } => {
      if p(value) {
        Arc::clone(node)
      } else {
        empty_node()
      }
    }
    Node::HCat { left, right, .. } => hnode(hfilter_node(left, p), hfilter_node(right, p)),
    Node::Slice { .. } => hfilter_node(&materialize_node(node), p),
    Node::VCat { .. } => unreachable!("a single-row rope has no vertical cats"),
  }
}
pub(crate) fn vfilter_node<T: Clone>(node: &Arc<Node<T>>, p: &impl Fn(&T) -> bool) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => leaf(s.filter_col(p)),
    Node::Sparse { value, .. } => {
      if p(value) {
        Arc::clone(node)
      } else {
        empty_node()
      }
    }
    Node::VCat { top, bottom, .. } => vnode(vfilter_node(top, p), vfilter_node(bottom, p)),
    Node::Slice { .. } => vfilter_node(&materialize_node(node), p),
    Node::HCat { .. } => unreachable!("a single-column rope has no horizontal cats"),
  }
}

/* Predicates */

fn forall_node<T>(node: &Node<T>, p: &impl Fn(&T) -> bool) -> bool {
  match node {
    Node::Empty => true,
    Node::Leaf(s) => s.iter().all(p),
    Node::Sparse { value, .. } => p(value),
    Node::HCat { left, right, .. } => forall_node(left, p) && forall_node(right, p),
    Node::VCat { top, bottom, .. } => forall_node(top, p) && forall_node(bottom, p),
    Node::Slice { i, j, rows, cols, inner } => {
      (*i..i + rows).all(|r| (*j..j + cols).all(|c| p(get_node(inner, r, c))))
    }
  }
}

/* Public */
impl<T: Clone> QuadRope<T> {
  /// Applies `f` to every cell, preserving shape and sparsity: a sparse
  /// region maps to a sparse region with `f` applied once to its value.
  /// Dense results are written into one fresh buffer; a fully sparse rope
  /// allocates nothing.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(2, 3, |i, j| i * 3 + j);
  /// assert_eq!(vec![0, 2, 4, 6, 8, 10], r.map(|v| v * 2).to_flat_array());
  /// ```
  pub fn map<U: Clone>(&self, f: impl Fn(&T) -> U) -> QuadRope<U> {
    let mut tgt = LazyTarget::new(self.rows(), self.cols());
    QuadRope::from_node(map_node(self.node(), &f, 0, 0, &mut tgt))
  }
  /// Combines two ropes of equal shape cell by cell. Matching structures
  /// recurse pairwise; a sparse side degenerates to a map with its value
  /// fixed; differing structures are aligned by splitting.
  pub fn zip<U: Clone, V: Clone>(
    &self,
    other: &QuadRope<U>,
    f: impl Fn(&T, &U) -> V,
  ) -> Result<QuadRope<V>> {
    if self.rows() != other.rows() || self.cols() != other.cols() {
      return Err(Error::ShapeMismatch {
        op: "zip",
        left: [self.rows(), self.cols()],
        right: [other.rows(), other.cols()],
      });
    }
    let mut tgt = LazyTarget::new(self.rows(), self.cols());
    Ok(QuadRope::from_node(zip_node(
      self.node(),
      other.node(),
      &f,
      0,
      0,
      &mut tgt,
    )))
  }
  /// Applies `f` to every row, producing a `rows x 1` rope of the
  /// results. Rows are presented as `1 x cols` slices.
  pub fn hmap<U: Clone>(&self, f: impl Fn(&QuadRope<T>) -> U) -> QuadRope<U> {
    QuadRope::init(self.rows(), 1, |i, _| f(&self.row(i)))
  }
  /// Applies `f` to every column, producing a `1 x cols` rope of the
  /// results.
  pub fn vmap<U: Clone>(&self, f: impl Fn(&QuadRope<T>) -> U) -> QuadRope<U> {
    QuadRope::init(1, self.cols(), |_, j| f(&self.col(j)))
  }
  /// Maps every cell with `g` and folds the results with the associative
  /// `f`, returning `epsilon` for the empty rope. A sparse region folds
  /// its mapped value once per covered cell without expanding.
  pub fn mapreduce<U: Clone>(
    &self,
    g: impl Fn(&T) -> U,
    f: impl Fn(&U, &U) -> U,
    epsilon: U,
  ) -> U {
    mapreduce_node(self.node(), &g, &f).unwrap_or(epsilon)
  }
  /// Folds every cell with the associative `f` whose identity is
  /// `epsilon`.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(3, 4, |i, j| i * 4 + j);
  /// assert_eq!(66, r.reduce(|a, b| a + b, 0));
  /// ```
  pub fn reduce(&self, f: impl Fn(&T, &T) -> T, epsilon: T) -> T {
    self.mapreduce(T::clone, f, epsilon)
  }
  /// Maps with `g` and folds each row with `f`, producing a `rows x 1`
  /// rope of per-row results.
  pub fn hmapreduce<U: Clone>(
    &self,
    g: impl Fn(&T) -> U,
    f: impl Fn(&U, &U) -> U,
  ) -> QuadRope<U> {
    QuadRope::from_node(hmapreduce_node(self.node(), &g, &f))
  }
  /// Maps with `g` and folds each column with `f`, producing a `1 x cols`
  /// rope of per-column results.
  pub fn vmapreduce<U: Clone>(
    &self,
    g: impl Fn(&T) -> U,
    f: impl Fn(&U, &U) -> U,
  ) -> QuadRope<U> {
    QuadRope::from_node(vmapreduce_node(self.node(), &g, &f))
  }
  /// Folds each row with the associative `f` into a `rows x 1` rope.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(2, 3, |i, j| i * 3 + j);
  /// assert_eq!(vec![3, 12], r.hreduce(|a, b| a + b).to_flat_array());
  /// ```
  pub fn hreduce(&self, f: impl Fn(&T, &T) -> T) -> QuadRope<T> {
    self.hmapreduce(T::clone, f)
  }
  /// Folds each column with the associative `f` into a `1 x cols` rope.
  pub fn vreduce(&self, f: impl Fn(&T, &T) -> T) -> QuadRope<T> {
    self.vmapreduce(T::clone, f)
  }
  /// Generalized summed-area table. For every cell,
  /// `out = in + out_above + out_left - out_diagonal`, where values
  /// outside the rectangle come from `init`, consulted only with a -1
  /// coordinate. `minus` must invert `plus`:
  /// `minus(&plus(&x, &y), &y) == x`.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(4, 4, |_, _| 1);
  /// let s = r.scan(|a, b| a + b, |a, b| a - b, |_, _| 0);
  /// assert_eq!(Ok(&16), s.get(3, 3));
  /// ```
  pub fn scan(
    &self,
    plus: impl Fn(&T, &T) -> T,
    minus: impl Fn(&T, &T) -> T,
    init: impl Fn(isize, isize) -> T,
  ) -> QuadRope<T> {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = Target::make(self.rows(), self.cols(), init(-1, -1));
    QuadRope::from_node(scan_node(self.node(), 0, 0, &tgt, &plus, &minus, &init))
  }
  /// Prefix scan along each row, left to right. `states(i)` is the
  /// accumulator seeding row `i`; no inverse of `f` is needed.
  pub fn hscan(&self, f: impl Fn(&T, &T) -> T, states: impl Fn(usize) -> T) -> QuadRope<T> {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = Target::make(self.rows(), self.cols(), states(0));
    QuadRope::from_node(hscan_node(self.node(), 0, 0, &tgt, &f, &states))
  }
  /// Prefix scan along each column, top to bottom. `states(j)` is the
  /// accumulator seeding column `j`.
  pub fn vscan(&self, f: impl Fn(&T, &T) -> T, states: impl Fn(usize) -> T) -> QuadRope<T> {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = Target::make(self.rows(), self.cols(), states(0));
    QuadRope::from_node(vscan_node(self.node(), 0, 0, &tgt, &f, &states))
  }
  /// Keeps the cells of a single-row rope that satisfy `p`. Fails with
  /// `ShapeMismatch` on any other height.
  /// ```
  /// fn main() -> Result<(), quad_rope::QuadRopeError> {
  ///   use quad_rope::QuadRope;
  ///   let r = QuadRope::init(1, 10, |_, j| j);
  ///   let kept = r.hfilter(|v| v % 2 == 0)?;
  ///   assert_eq!(1, kept.rows());
  ///   assert_eq!(vec![0, 2, 4, 6, 8], kept.to_flat_array());
  ///   Ok(())
  /// }
  /// ```
  pub fn hfilter(&self, p: impl Fn(&T) -> bool) -> Result<Self> {
    if self.rows() != 1 {
      return Err(Error::ShapeMismatch {
        op: "hfilter",
        left: [self.rows(), self.cols()],
        right: [1, self.cols()],
      });
    }
    Ok(QuadRope::from_node(hfilter_node(self.node(), &p)))
  }
  /// Keeps the cells of a single-column rope that satisfy `p`. Fails with
  /// `ShapeMismatch` on any other width.
  pub fn vfilter(&self, p: impl Fn(&T) -> bool) -> Result<Self> {
    if self.cols() != 1 {
      return Err(Error::ShapeMismatch {
        op: "vfilter",
        left: [self.rows(), self.cols()],
        right: [self.rows(), 1],
      });
    }
    Ok(QuadRope::from_node(vfilter_node(self.node(), &p)))
  }
  /// True if `p` holds for every cell. Sparse regions test their value
  /// once.
  pub fn forall(&self, p: impl Fn(&T) -> bool) -> bool {
    forall_node(self.node(), &p)
  }
  /// True if `p` holds for at least one cell.
  pub fn exists(&self, p: impl Fn(&T) -> bool) -> bool {
    !self.forall(|v| !p(v))
  }
}
impl<T: Clone + PartialEq> QuadRope<T> {
  /// Cell-wise equality of two ropes. Unlike `==`, differing shapes are a
  /// `ShapeMismatch` error rather than `false`.
  pub fn equals(&self, other: &Self) -> Result<bool> {
    if self.rows() != other.rows() || self.cols() != other.cols() {
      return Err(Error::ShapeMismatch {
        op: "equals",
        left: [self.rows(), self.cols()],
        right: [other.rows(), other.cols()],
      });
    }
    let matches = self.zip(other, |a, b| a == b)?;
    Ok(matches.forall(|m| *m))
  }
}

/* Tests */
#[cfg(test)]
mod api {
  use super::*;
  use crate::rope::fixtures;
  #[test]
  fn map_preserves_shape_and_sparsity() {
    let r = fixtures::mixed(6, 4);
    let m = r.map(|v| v + 1);
    assert_eq!(r.rows(), m.rows());
    assert_eq!(r.cols(), m.cols());
    assert!(m.is_sparse());
    for (a, b) in r.cells().zip(m.cells()) {
      assert_eq!(a + 1, *b);
    }
  }
  #[test]
  fn map_on_sparse_allocates_nothing_dense() {
    let r = QuadRope::create(100, 100, 2);
    let m = r.map(|v| v * 3);
    assert_eq!(0, m.depth());
    assert_eq!(Ok(&6), m.get(99, 99));
  }
  #[test]
  fn zip_same_structure() {
    let a = QuadRope::init(3, 5, |i, j| (i * 5 + j) as i64);
    let b = a.map(|v| v * 10);
    let z = a.zip(&b, |x, y| x + y).unwrap();
    assert_eq!(
      (0..15).map(|v| v * 11).collect::<Vec<i64>>(),
      z.to_flat_array(),
    );
  }
  #[test]
  fn zip_mismatched_structure() {
    // Same shape, built along different axes.
    let a = QuadRope::init(4, 2, |i, j| i * 2 + j)
      .hcat(&QuadRope::init(4, 4, |i, j| 100 + i * 4 + j))
      .unwrap();
    let b = QuadRope::init(2, 6, |i, j| i * 6 + j)
      .vcat(&QuadRope::init(2, 6, |i, j| 50 + i * 6 + j))
      .unwrap();
    let z = a.zip(&b, |x, y| x + y).unwrap();
    assert_eq!(4, z.rows());
    assert_eq!(6, z.cols());
    for i in 0..4 {
      for j in 0..6 {
        let expect = a.get(i, j).unwrap() + b.get(i, j).unwrap();
        assert_eq!(&expect, z.get(i, j).unwrap());
      }
    }
  }
  #[test]
  fn zip_sparse_collapses() {
    let a = QuadRope::create(4, 4, 2);
    let b = QuadRope::create(4, 4, 3);
    let z = a.zip(&b, |x, y| x * y).unwrap();
    assert_eq!(0, z.depth());
    assert!(z.is_sparse());
    assert_eq!(Ok(&6), z.get(2, 2));
  }
  #[test]
  fn zip_shape_mismatch() {
    let a = QuadRope::init(2, 2, |_, _| 0);
    let b = QuadRope::init(2, 3, |_, _| 0);
    assert!(a.zip(&b, |x, y| x + y).is_err());
  }
  #[test]
  fn reduce_identity_on_empty() {
    let r: QuadRope<i32> = QuadRope::empty();
    assert_eq!(7, r.reduce(|a, b| a + b, 7));
  }
  #[test]
  fn reduce_singleton() {
    let r = QuadRope::singleton(5);
    assert_eq!(5, r.reduce(|a, b| a + b, 0));
  }
  #[test]
  fn reduce_sparse_counts_every_cell() {
    let r = QuadRope::create(10, 10, 7.0);
    assert_eq!(700.0, r.reduce(|a, b| a + b, 0.0));
  }
  #[test]
  fn mapreduce_mixed() {
    let r = fixtures::mixed(6, 4);
    let by_cells: i64 = r.cells().map(|v| v * v).sum();
    assert_eq!(by_cells, r.mapreduce(|v| v * v, |a, b| a + b, 0));
  }
  #[test]
  fn hreduce_row_sums() {
    let r = QuadRope::init(3, 4, |i, j| (i * 4 + j) as i64);
    assert_eq!(vec![6, 22, 38], r.hreduce(|a, b| a + b).to_flat_array());
  }
  #[test]
  fn vreduce_col_sums() {
    let r = QuadRope::init(3, 4, |i, j| (i * 4 + j) as i64);
    assert_eq!(vec![12, 15, 18, 21], r.vreduce(|a, b| a + b).to_flat_array());
  }
  #[test]
  fn hreduce_across_cats() {
    let r = fixtures::mixed(6, 4);
    let sums = r.hreduce(|a, b| a + b);
    assert_eq!(r.rows(), sums.rows());
    assert_eq!(1, sums.cols());
    for i in 0..r.rows() {
      let row_sum: i64 = {
        let row = r.row(i);
        row.cells().sum()
      };
      assert_eq!(&row_sum, sums.get(i, 0).unwrap());
    }
  }
  #[test]
  fn hmap_vmap() {
    let r = QuadRope::init(2, 3, |i, j| (i * 3 + j) as i64);
    let widths = r.hmap(|row| row.cols());
    assert_eq!(vec![3, 3], widths.to_flat_array());
    let sums = r.vmap(|col| col.reduce(|a, b| a + b, 0));
    assert_eq!(vec![3, 5, 7], sums.to_flat_array());
  }
  #[test]
  fn scan_of_ones_multiplies_indices() {
    let r = QuadRope::init(4, 4, |_, _| 1);
    let s = r.scan(|a, b| a + b, |a, b| a - b, |_, _| 0);
    for i in 0..4 {
      for j in 0..4 {
        assert_eq!(&(((i + 1) * (j + 1)) as i32), s.get(i, j).unwrap());
      }
    }
  }
  #[test]
  fn scan_satisfies_recurrence() {
    let r = fixtures::mixed(6, 4);
    let s = r.scan(|a, b| a + b, |a, b| a - b, |_, _| 0);
    let out = |i: isize, j: isize| -> i64 {
      if i < 0 || j < 0 {
        0
      } else {
        *s.get(i as usize, j as usize).unwrap()
      }
    };
    for i in 0..r.rows() as isize {
      for j in 0..r.cols() as isize {
        let input = *r.get(i as usize, j as usize).unwrap();
        assert_eq!(
          out(i, j),
          input + out(i - 1, j) + out(i, j - 1) - out(i - 1, j - 1),
        );
      }
    }
  }
  #[test]
  fn scan_with_boundary_prefix() {
    let r = QuadRope::init(2, 2, |_, _| 0);
    let s = r.scan(|a, b| a + b, |a, b| a - b, |i, j| {
      if i < 0 && j < 0 {
        0
      } else if i < 0 {
        j as i32 + 1
      } else {
        i as i32 + 1
      }
    });
    // Boundary rows and columns accumulate into the table.
    assert_eq!(Ok(&2), s.get(0, 0));
    assert_eq!(Ok(&4), s.get(1, 1));
  }
  #[test]
  fn hscan_prefix_rows() {
    let r = QuadRope::init(2, 4, |_, _| 1);
    let s = r.hscan(|a, b| a + b, |_| 0);
    assert_eq!(vec![1, 2, 3, 4, 1, 2, 3, 4], s.to_flat_array());
  }
  #[test]
  fn hscan_seeds_rows() {
    let r = QuadRope::init(2, 3, |_, _| 1);
    let s = r.hscan(|a, b| a + b, |i| (i * 10) as i32);
    assert_eq!(vec![1, 2, 3, 11, 12, 13], s.to_flat_array());
  }
  #[test]
  fn vscan_prefix_cols() {
    let r = QuadRope::init(4, 2, |_, _| 1);
    let s = r.vscan(|a, b| a + b, |_| 0);
    assert_eq!(vec![1, 1, 2, 2, 3, 3, 4, 4], s.to_flat_array());
  }
  #[test]
  fn hscan_across_cats() {
    let r = QuadRope::init(1, 3, |_, j| (j + 1) as i64)
      .hcat(&QuadRope::create(1, 3, 1))
      .unwrap();
    let s = r.hscan(|a, b| a + b, |_| 0);
    assert_eq!(vec![1, 3, 6, 7, 8, 9], s.to_flat_array());
  }
  #[test]
  fn hfilter_keeps_matching_cells() {
    let r = QuadRope::init(1, 10, |_, j| j);
    let kept = r.hfilter(|v| v % 2 == 0).unwrap();
    assert_eq!(1, kept.rows());
    assert_eq!(5, kept.cols());
    assert_eq!(vec![0, 2, 4, 6, 8], kept.to_flat_array());
  }
  #[test]
  fn hfilter_sparse_row() {
    let r = QuadRope::create(1, 9, 4);
    assert_eq!(r, r.hfilter(|v| *v == 4).unwrap());
    assert!(r.hfilter(|v| *v != 4).unwrap().is_empty());
  }
  #[test]
  fn hfilter_requires_single_row() {
    let r = QuadRope::init(2, 2, |_, _| 0);
    assert!(r.hfilter(|_| true).is_err());
  }
  #[test]
  fn vfilter_keeps_matching_cells() {
    let r = QuadRope::init(10, 1, |i, _| i);
    let kept = r.vfilter(|v| v % 2 == 1).unwrap();
    assert_eq!(5, kept.rows());
    assert_eq!(1, kept.cols());
    assert_eq!(vec![1, 3, 5, 7, 9], kept.to_flat_array());
  }
  #[test]
  fn forall_exists() {
    let r = fixtures::mixed(6, 4);
    assert!(r.forall(|v| *v >= 0));
    assert!(!r.forall(|v| *v > 0));
    assert!(r.exists(|v| *v == 0));
    assert!(!r.exists(|v| *v < 0));
  }
  #[test]
  fn equals_checks_shape_first() {
    let a = QuadRope::init(2, 2, |_, _| 1);
    let b = QuadRope::init(2, 3, |_, _| 1);
    assert!(a.equals(&b).is_err());
    let c = QuadRope::create(2, 2, 1);
    assert_eq!(Ok(true), a.equals(&c));
    let d = a.set(1, 1, 9).unwrap();
    assert_eq!(Ok(false), a.equals(&d));
  }
}
