//! The rope layer: tree variants, pseudo-constructors, indexing, slicing,
//! balancing, concatenation, reverse, transpose and materialization, with
//! bulk operations, iterators, numerics and the parallel overlay in
//! submodules.

mod bulk;
mod iterators;
pub mod num;
mod parallel;

pub use iterators::{Cells, Rows};
pub use parallel::Progress;

/* Common */
use std::sync::Arc;

use crate::error::QuadRopeError as Error;
use crate::fibonacci::{fib, MAX_DEPTH};
use crate::slice::ArraySlice;
use crate::target::LazyTarget;

type Result<T> = std::result::Result<T, Error>;

/// Maximum edge length of a dense tile. Larger rectangles are split into
/// trees of tiles. The debug value keeps trees deep enough for tests to
/// exercise every recursion.
#[cfg(not(debug_assertions))]
pub(crate) const MAX_TILE_EDGE: usize = 32;
#[cfg(debug_assertions)]
pub(crate) const MAX_TILE_EDGE: usize = 4;

/// The tree behind a [`QuadRope`]. Interior nodes describe horizontal or
/// vertical adjacency of two rectangles; leaves hold dense tiles; sparse
/// nodes describe constant rectangles in O(1) space; slice nodes are
/// windows materialized on demand.
///
/// Variants are built exclusively through the pseudo-constructors below,
/// which collapse empties, fuse nested slices and keep the cached shape,
/// depth and sparsity fields consistent.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
  feature = "serde",
  serde(bound(
    serialize = "T: Clone + serde::Serialize",
    deserialize = "T: Clone + serde::Deserialize<'de>"
  ))
)]
pub(crate) enum Node<T> {
  Empty,
  Leaf(ArraySlice<T>),
  HCat {
    sparse: bool,
    depth: usize,
    rows: usize,
    cols: usize,
    left: Arc<Node<T>>,
    right: Arc<Node<T>>,
  },
  VCat {
    sparse: bool,
    depth: usize,
    rows: usize,
    cols: usize,
    top: Arc<Node<T>>,
    bottom: Arc<Node<T>>,
  },
  Slice {
    i: usize,
    j: usize,
    rows: usize,
    cols: usize,
    inner: Arc<Node<T>>,
  },
  Sparse {
    rows: usize,
    cols: usize,
    value: T,
  },
}

/* Shape */
impl<T> Node<T> {
  pub(crate) fn rows(&self) -> usize {
    match self {
      Node::Empty => 0,
      Node::Leaf(s) => s.rows(),
      Node::HCat { rows, .. } | Node::VCat { rows, .. } => *rows,
      Node::Slice { rows, .. } => *rows,
      Node::Sparse { rows, .. } => *rows,
    }
  }
  pub(crate) fn cols(&self) -> usize {
    match self {
      Node::Empty => 0,
      Node::Leaf(s) => s.cols(),
      Node::HCat { cols, .. } | Node::VCat { cols, .. } => *cols,
      Node::Slice { cols, .. } => *cols,
      Node::Sparse { cols, .. } => *cols,
    }
  }
  pub(crate) fn depth(&self) -> usize {
    match self {
      Node::HCat { depth, .. } | Node::VCat { depth, .. } => *depth,
      Node::Slice { inner, .. } => inner.depth(),
      _ => 0,
    }
  }
  pub(crate) fn has_sparse(&self) -> bool {
    match self {
      Node::Sparse { .. } => true,
      Node::HCat { sparse, .. } | Node::VCat { sparse, .. } => *sparse,
      Node::Slice { inner, .. } => inner.has_sparse(),
      _ => false,
    }
  }
  pub(crate) fn is_empty(&self) -> bool {
    matches!(self, Node::Empty)
  }
}

/* Pseudo-constructors */

pub(crate) fn empty_node<T>() -> Arc<Node<T>> {
  Arc::new(Node::Empty)
}
pub(crate) fn sparse_node<T>(rows: usize, cols: usize, value: T) -> Arc<Node<T>> {
  if rows == 0 || cols == 0 {
    empty_node()
  } else {
    Arc::new(Node::Sparse { rows, cols, value })
  }
}
pub(crate) fn leaf<T>(s: ArraySlice<T>) -> Arc<Node<T>> {
  if s.rows() == 0 || s.cols() == 0 {
    empty_node()
  } else {
    Arc::new(Node::Leaf(s))
  }
}
pub(crate) fn hnode<T>(a: Arc<Node<T>>, b: Arc<Node<T>>) -> Arc<Node<T>> {
  if a.is_empty() {
    return b;
  }
  if b.is_empty() {
    return a;
  }
  debug_assert_eq!(a.rows(), b.rows());
  Arc::new(Node::HCat {
    sparse: a.has_sparse() || b.has_sparse(),
    depth: 1 + a.depth().max(b.depth()),
    rows: a.rows(),
    cols: a.cols() + b.cols(),
    left: a,
    right: b,
  })
}
pub(crate) fn vnode<T>(a: Arc<Node<T>>, b: Arc<Node<T>>) -> Arc<Node<T>> {
  if a.is_empty() {
    return b;
  }
  if b.is_empty() {
    return a;
  }
  debug_assert_eq!(a.cols(), b.cols());
  Arc::new(Node::VCat {
    sparse: a.has_sparse() || b.has_sparse(),
    depth: 1 + a.depth().max(b.depth()),
    rows: a.rows() + b.rows(),
    cols: a.cols(),
    top: a,
    bottom: b,
  })
}
/// Builds a clamped window onto `r`. Covers of the whole rope return `r`
/// itself; windows onto windows fuse by offset addition; leaves and sparse
/// rectangles reshape directly.
pub(crate) fn slice_node<T: Clone>(
  i: usize,
  j: usize,
  h: usize,
  w: usize,
  r: &Arc<Node<T>>,
) -> Arc<Node<T>> {
  let i = i.min(r.rows());
  let j = j.min(r.cols());
  let h = h.min(r.rows() - i);
  let w = w.min(r.cols() - j);
  if h == 0 || w == 0 {
    return empty_node();
  }
  if i == 0 && j == 0 && h == r.rows() && w == r.cols() {
    return Arc::clone(r);
  }
  match &**r {
    Node::Slice {
      i: i2, j: j2, inner, ..
    } => Arc::new(Node::Slice {
      i: i + i2,
      j: j + j2,
      rows: h,
      cols: w,
      inner: Arc::clone(inner),
    }),
    Node::Sparse { value, .. } => sparse_node(h, w, value.clone()),
    Node::Leaf(s) => leaf(s.slice(i, j, h, w)),
    _ => Arc::new(Node::Slice {
      i,
      j,
      rows: h,
      cols: w,
      inner: Arc::clone(r),
    }),
  }
}
/// Splits one tile into a tree of tiles no larger than
/// [`MAX_TILE_EDGE`] on a side, bisecting the longer axis. All pieces
/// share the slice's buffer.
pub(crate) fn grid<T: Clone>(s: ArraySlice<T>) -> Arc<Node<T>> {
  let (h, w) = (s.rows(), s.cols());
  if h == 0 || w == 0 {
    return empty_node();
  }
  if h <= MAX_TILE_EDGE && w <= MAX_TILE_EDGE {
    return Arc::new(Node::Leaf(s));
  }
  if w >= h {
    let half = w / 2;
    hnode(grid(s.slice(0, 0, h, half)), grid(s.slice(0, half, h, w - half)))
  } else {
    let half = h / 2;
    vnode(grid(s.slice(0, 0, half, w)), grid(s.slice(half, 0, h - half, w)))
  }
}

/* Concatenation */

pub(crate) fn hcat_nodes<T: Clone + PartialEq>(
  a: &Arc<Node<T>>,
  b: &Arc<Node<T>>,
) -> Result<Arc<Node<T>>> {
  if a.is_empty() {
    return Ok(Arc::clone(b));
  }
  if b.is_empty() {
    return Ok(Arc::clone(a));
  }
  if a.rows() != b.rows() {
    return Err(Error::ShapeMismatch {
      op: "hcat",
      left: [a.rows(), a.cols()],
      right: [b.rows(), b.cols()],
    });
  }
  Ok(hbalance_node(merge_h(a, b)))
}
pub(crate) fn vcat_nodes<T: Clone + PartialEq>(
  a: &Arc<Node<T>>,
  b: &Arc<Node<T>>,
) -> Result<Arc<Node<T>>> {
  if a.is_empty() {
    return Ok(Arc::clone(b));
  }
  if b.is_empty() {
    return Ok(Arc::clone(a));
  }
  if a.cols() != b.cols() {
    return Err(Error::ShapeMismatch {
      op: "vcat",
      left: [a.rows(), a.cols()],
      right: [b.rows(), b.cols()],
    });
  }
  Ok(vbalance_node(merge_v(a, b)))
}
/// Structural merges before building an `HCat`: two small leaves fuse into
/// one, a cat whose far leaf can absorb an incoming leaf does so, and two
/// sparse rectangles of one value join.
fn merge_h<T: Clone + PartialEq>(a: &Arc<Node<T>>, b: &Arc<Node<T>>) -> Arc<Node<T>> {
  match (&**a, &**b) {
    (Node::Leaf(l), Node::Leaf(r)) if l.cols() + r.cols() <= MAX_TILE_EDGE => leaf(l.hcat(r)),
    (
      Node::Sparse {
        rows, cols: w1, value: v1,
      },
      Node::Sparse {
        cols: w2, value: v2, ..
      },
    ) if v1 == v2 => sparse_node(*rows, w1 + w2, v1.clone()),
    (Node::HCat { left, right, .. }, Node::Leaf(r)) => {
      if let Node::Leaf(l) = &**right {
        if l.cols() + r.cols() <= MAX_TILE_EDGE {
          return hnode(Arc::clone(left), leaf(l.hcat(r)));
        }
      }
      hnode(Arc::clone(a), Arc::clone(b))
    }
    (Node::Leaf(l), Node::HCat { left, right, .. }) => {
      if let Node::Leaf(r) = &**left {
        if l.cols() + r.cols() <= MAX_TILE_EDGE {
          return hnode(leaf(l.hcat(r)), Arc::clone(right));
        }
      }
      hnode(Arc::clone(a), Arc::clone(b))
    }
    _ => hnode(Arc::clone(a), Arc::clone(b)),
  }
}
fn merge_v<T: Clone + PartialEq>(a: &Arc<Node<T>>, b: &Arc<Node<T>>) -> Arc<Node<T>> {
  match (&**a, &**b) {
    (Node::Leaf(t), Node::Leaf(u)) if t.rows() + u.rows() <= MAX_TILE_EDGE => leaf(t.vcat(u)),
    (
      Node::Sparse {
        rows: h1, cols, value: v1,
      },
      Node::Sparse {
        rows: h2, value: v2, ..
      },
    ) if v1 == v2 => sparse_node(h1 + h2, *cols, v1.clone()),
    (Node::VCat { top, bottom, .. }, Node::Leaf(u)) => {
      if let Node::Leaf(t) = &**bottom {
        if t.rows() + u.rows() <= MAX_TILE_EDGE {
          return vnode(Arc::clone(top), leaf(t.vcat(u)));
        }
      }
      vnode(Arc::clone(a), Arc::clone(b))
    }
    (Node::Leaf(t), Node::VCat { top, bottom, .. }) => {
      if let Node::Leaf(u) = &**top {
        if t.rows() + u.rows() <= MAX_TILE_EDGE {
          return vnode(leaf(t.vcat(u)), Arc::clone(bottom));
        }
      }
      vnode(Arc::clone(a), Arc::clone(b))
    }
    _ => vnode(Arc::clone(a), Arc::clone(b)),
  }
}

/* Balancing */

fn h_balanced(depth: usize, cols: usize) -> bool {
  depth < MAX_DEPTH && fib(depth + 2) <= cols as u64
}
fn v_balanced(depth: usize, rows: usize) -> bool {
  depth < MAX_DEPTH && fib(depth + 2) <= rows as u64
}
pub(crate) fn hbalance_node<T: Clone>(node: Arc<Node<T>>) -> Arc<Node<T>> {
  if h_balanced(node.depth(), node.cols()) {
    return node;
  }
  match &*node {
    Node::HCat { .. } => {
      let mut parts = Vec::new();
      collect_h(&node, &mut parts);
      rebuild(parts, hnode)
    }
    Node::VCat { top, bottom, .. } => vnode(
      hbalance_node(Arc::clone(top)),
      hbalance_node(Arc::clone(bottom)),
    ),
    Node::Slice { .. } => hbalance_node(materialize_node(&node)),
    _ => node,
  }
}
pub(crate) fn vbalance_node<T: Clone>(node: Arc<Node<T>>) -> Arc<Node<T>> {
  if v_balanced(node.depth(), node.rows()) {
    return node;
  }
  match &*node {
    Node::VCat { .. } => {
      let mut parts = Vec::new();
      collect_v(&node, &mut parts);
      rebuild(parts, vnode)
    }
    Node::HCat { left, right, .. } => hnode(
      vbalance_node(Arc::clone(left)),
      vbalance_node(Arc::clone(right)),
    ),
    Node::Slice { .. } => vbalance_node(materialize_node(&node)),
    _ => node,
  }
}
fn collect_h<T: Clone>(node: &Arc<Node<T>>, parts: &mut Vec<Arc<Node<T>>>) {
  match &**node {
    Node::HCat { left, right, .. } => {
      collect_h(left, parts);
      collect_h(right, parts);
    }
    _ => parts.push(hbalance_node(Arc::clone(node))),
  }
}
fn collect_v<T: Clone>(node: &Arc<Node<T>>, parts: &mut Vec<Arc<Node<T>>>) {
  match &**node {
    Node::VCat { top, bottom, .. } => {
      collect_v(top, parts);
      collect_v(bottom, parts);
    }
    _ => parts.push(vbalance_node(Arc::clone(node))),
  }
}
/// Pairs adjacent pieces left to right, halving the list per pass, until a
/// single rope of depth `ceil(log2 n)` over the pieces remains.
fn rebuild<T>(
  mut parts: Vec<Arc<Node<T>>>,
  join: fn(Arc<Node<T>>, Arc<Node<T>>) -> Arc<Node<T>>,
) -> Arc<Node<T>> {
  debug_assert!(!parts.is_empty());
  while parts.len() > 1 {
    parts = parts
      .chunks(2)
      .map(|pair| {
        if pair.len() == 2 {
          join(Arc::clone(&pair[0]), Arc::clone(&pair[1]))
        } else {
          Arc::clone(&pair[0])
        }
      })
      .collect();
  }
  parts.pop().unwrap()
}

/* Materialization */

/// Pushes every slice frame down to the tiles and sparse rectangles it
/// windows, preserving interior cats. Tile buffers are shared, never
/// copied.
pub(crate) fn materialize_node<T: Clone>(node: &Arc<Node<T>>) -> Arc<Node<T>> {
  match &**node {
    Node::Slice {
      i, j, rows, cols, inner,
    } => mat(*i, *j, *rows, *cols, inner),
    Node::HCat { left, right, .. } => hnode(materialize_node(left), materialize_node(right)),
    Node::VCat { top, bottom, .. } => vnode(materialize_node(top), materialize_node(bottom)),
    _ => Arc::clone(node),
  }
}
fn mat<T: Clone>(i: usize, j: usize, h: usize, w: usize, node: &Arc<Node<T>>) -> Arc<Node<T>> {
  let i = i.min(node.rows());
  let j = j.min(node.cols());
  let h = h.min(node.rows() - i);
  let w = w.min(node.cols() - j);
  if h == 0 || w == 0 {
    return empty_node();
  }
  if i == 0 && j == 0 && h == node.rows() && w == node.cols() {
    return materialize_node(node);
  }
  match &**node {
    Node::Empty => empty_node(),
    Node::Leaf(s) => leaf(s.slice(i, j, h, w)),
    Node::Sparse { value, .. } => sparse_node(h, w, value.clone()),
    Node::Slice {
      i: i2, j: j2, inner, ..
    } => mat(i + i2, j + j2, h, w, inner),
    Node::HCat { left, right, .. } => {
      let lw = left.cols();
      let l = if j < lw {
        mat(i, j, h, w.min(lw - j), left)
      } else {
        empty_node()
      };
      let r = if j + w > lw {
        mat(i, j.saturating_sub(lw), h, (j + w) - lw.max(j), right)
      } else {
        empty_node()
      };
      hnode(l, r)
    }
    Node::VCat { top, bottom, .. } => {
      let th = top.rows();
      let t = if i < th {
        mat(i, j, h.min(th - i), w, top)
      } else {
        empty_node()
      };
      let b = if i + h > th {
        mat(i.saturating_sub(th), j, (i + h) - th.max(i), w, bottom)
      } else {
        empty_node()
      };
      vnode(t, b)
    }
  }
}

/* Indexing */

pub(crate) fn get_node<'a, T>(node: &'a Node<T>, i: usize, j: usize) -> &'a T {
  match node {
    Node::Leaf(s) => s.get(i, j),
    Node::HCat { left, right, .. } => {
      if j < left.cols() {
        get_node(left, i, j)
      } else {
        get_node(right, i, j - left.cols())
      }
    }
    Node::VCat { top, bottom, .. } => {
      if i < top.rows() {
        get_node(top, i, j)
      } else {
        get_node(bottom, i - top.rows(), j)
      }
    }
    Node::Slice {
      i: si, j: sj, inner, ..
    } => get_node(inner, i + si, j + sj),
    Node::Sparse { value, .. } => value,
    Node::Empty => unreachable!("indexing is bounds-checked before descending"),
  }
}
fn set_node<T: Clone>(node: &Arc<Node<T>>, i: usize, j: usize, v: T) -> Arc<Node<T>> {
  match &**node {
    Node::Leaf(s) => leaf(s.with_cell(i, j, v)),
    Node::Sparse { rows, cols, value } => {
      let (h, w) = (*rows, *cols);
      grid(ArraySlice::from_fn(h, w, |r, c| {
        if r == i && c == j {
          v.clone()
        } else {
          value.clone()
        }
      }))
    }
    Node::HCat { left, right, .. } => {
      if j < left.cols() {
        hnode(set_node(left, i, j, v), Arc::clone(right))
      } else {
        hnode(Arc::clone(left), set_node(right, i, j - left.cols(), v))
      }
    }
    Node::VCat { top, bottom, .. } => {
      if i < top.rows() {
        vnode(set_node(top, i, j, v), Arc::clone(bottom))
      } else {
        vnode(Arc::clone(top), set_node(bottom, i - top.rows(), j, v))
      }
    }
    Node::Slice {
      i: si,
      j: sj,
      rows,
      cols,
      inner,
    } => Arc::new(Node::Slice {
      i: *si,
      j: *sj,
      rows: *rows,
      cols: *cols,
      inner: set_node(inner, i + si, j + sj, v),
    }),
    Node::Empty => unreachable!("indexing is bounds-checked before descending"),
  }
}

/* Reverse and transpose */

pub(crate) fn hrev_node<T: Clone>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  total_cols: usize,
  tgt: &mut LazyTarget<T>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty | Node::Sparse { .. } => Arc::clone(node),
    Node::Leaf(s) => {
      let (h, w) = (s.rows(), s.cols());
      let t = tgt.at(i, total_cols - j - w, s.get(0, 0));
      for r in 0..h {
        for c in 0..w {
          t.write(r, c, s.get(r, w - 1 - c).clone());
        }
      }
      leaf(t.freeze(h, w))
    }
    Node::HCat { left, right, .. } => {
      let b = hrev_node(right, i, j + left.cols(), total_cols, tgt);
      let a = hrev_node(left, i, j, total_cols, tgt);
      hnode(b, a)
    }
    Node::VCat { top, bottom, .. } => {
      let a = hrev_node(top, i, j, total_cols, tgt);
      let b = hrev_node(bottom, i + top.rows(), j, total_cols, tgt);
      vnode(a, b)
    }
    Node::Slice { .. } => hrev_node(&materialize_node(node), i, j, total_cols, tgt),
  }
}
pub(crate) fn vrev_node<T: Clone>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  total_rows: usize,
  tgt: &mut LazyTarget<T>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty | Node::Sparse { .. } => Arc::clone(node),
    Node::Leaf(s) => {
      let (h, w) = (s.rows(), s.cols());
      let t = tgt.at(total_rows - i - h, j, s.get(0, 0));
      for r in 0..h {
        for c in 0..w {
          t.write(r, c, s.get(h - 1 - r, c).clone());
        }
      }
      leaf(t.freeze(h, w))
    }
    Node::VCat { top, bottom, .. } => {
      let b = vrev_node(bottom, i + top.rows(), j, total_rows, tgt);
      let a = vrev_node(top, i, j, total_rows, tgt);
      vnode(b, a)
    }
    Node::HCat { left, right, .. } => {
      let a = vrev_node(left, i, j, total_rows, tgt);
      let b = vrev_node(right, i, j + left.cols(), total_rows, tgt);
      hnode(a, b)
    }
    Node::Slice { .. } => vrev_node(&materialize_node(node), i, j, total_rows, tgt),
  }
}
pub(crate) fn transpose_node<T: Clone>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  tgt: &mut LazyTarget<T>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Sparse { rows, cols, value } => sparse_node(*cols, *rows, value.clone()),
    Node::Leaf(s) => {
      let (h, w) = (s.rows(), s.cols());
      let t = tgt.at(j, i, s.get(0, 0));
      for c in 0..w {
        for r in 0..h {
          t.write(c, r, s.get(r, c).clone());
        }
      }
      leaf(t.freeze(w, h))
    }
    Node::HCat { left, right, .. } => {
      let a = transpose_node(left, i, j, tgt);
      let b = transpose_node(right, i, j + left.cols(), tgt);
      vnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = transpose_node(top, i, j, tgt);
      let b = transpose_node(bottom, i + top.rows(), j, tgt);
      hnode(a, b)
    }
    Node::Slice { .. } => transpose_node(&materialize_node(node), i, j, tgt),
  }
}

/* Compression */

fn compress_node<T: Clone + PartialEq>(node: &Arc<Node<T>>) -> Arc<Node<T>> {
  match &**node {
    Node::Leaf(s) => {
      let first = s.get(0, 0);
      if s.iter().all(|v| v == first) {
        sparse_node(s.rows(), s.cols(), first.clone())
      } else {
        Arc::clone(node)
      }
    }
    Node::HCat { left, right, .. } => {
      let a = compress_node(left);
      let b = compress_node(right);
      merge_h(&a, &b)
    }
    Node::VCat { top, bottom, .. } => {
      let a = compress_node(top);
      let b = compress_node(bottom);
      merge_v(&a, &b)
    }
    Node::Slice { .. } => compress_node(&materialize_node(node)),
    _ => Arc::clone(node),
  }
}

/// A persistent, immutable two-dimensional sequence addressed by
/// `(row, column)`.
///
/// Every operation returns a new rope sharing structure with its inputs;
/// nothing is mutated in place. Large constant rectangles are stored in
/// O(1) space and most bulk operations take fast paths across them.
///
/// ```
/// fn main() -> Result<(), quad_rope::QuadRopeError> {
///   use quad_rope::QuadRope;
///   let r = QuadRope::init(3, 4, |i, j| i * 4 + j);
///   assert_eq!(3, r.rows());
///   assert_eq!(4, r.cols());
///   assert_eq!(&11, r.get(2, 3)?);
///   let s = r.set(0, 0, 100)?;
///   assert_eq!(&100, s.get(0, 0)?);
///   assert_eq!(&0, r.get(0, 0)?);
///   Ok(())
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
  feature = "serde",
  serde(bound(
    serialize = "T: Clone + serde::Serialize",
    deserialize = "T: Clone + serde::Deserialize<'de>"
  ))
)]
pub struct QuadRope<T> {
  root: Arc<Node<T>>,
}
impl<T> Clone for QuadRope<T> {
  fn clone(&self) -> Self {
    QuadRope {
      root: Arc::clone(&self.root),
    }
  }
}

/* Public */
impl<T> QuadRope<T> {
  pub(crate) fn from_node(root: Arc<Node<T>>) -> Self {
    QuadRope { root }
  }
  pub(crate) fn node(&self) -> &Arc<Node<T>> {
    &self.root
  }
  /// Returns the rope of the 0x0 rectangle.
  pub fn empty() -> Self {
    QuadRope::from_node(empty_node())
  }
  /// Number of rows of the rectangle this rope represents.
  pub fn rows(&self) -> usize {
    self.root.rows()
  }
  /// Number of columns of the rectangle this rope represents.
  pub fn cols(&self) -> usize {
    self.root.cols()
  }
  /// Depth of the underlying tree. Leaves, sparse rectangles and the empty
  /// rope have depth 0.
  pub fn depth(&self) -> usize {
    self.root.depth()
  }
  /// Returns true if the rope holds no cells.
  pub fn is_empty(&self) -> bool {
    self.rows() == 0 || self.cols() == 0
  }
  /// Returns true if the rope is exactly one cell.
  pub fn is_singleton(&self) -> bool {
    self.rows() == 1 && self.cols() == 1
  }
  /// Returns true if the rope contains a sparse region, i.e. a rectangle
  /// of one repeated value stored in O(1) space.
  pub fn is_sparse(&self) -> bool {
    self.root.has_sparse()
  }
}
impl<T: Clone> QuadRope<T> {
  /// Returns a rope of exactly one cell.
  pub fn singleton(value: T) -> Self {
    QuadRope::from_node(leaf(ArraySlice::singleton(value)))
  }
  /// Returns an `h x w` rope in which every cell equals `value`, stored in
  /// O(1) space. Zero dimensions yield the empty rope.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::create(1000, 1000, 7.0);
  /// assert_eq!(1000, r.rows());
  /// assert!(r.is_sparse());
  /// assert_eq!(0, r.depth());
  /// ```
  pub fn create(rows: usize, cols: usize, value: T) -> Self {
    QuadRope::from_node(sparse_node(rows, cols, value))
  }
  /// Builds an `h x w` rope from a generator. All cells land in one dense
  /// buffer, tiled into a balanced tree. Zero dimensions yield the empty
  /// rope.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(2, 3, |i, j| (i, j));
  /// assert_eq!(Ok(&(1, 2)), r.get(1, 2));
  /// ```
  pub fn init(rows: usize, cols: usize, f: impl Fn(usize, usize) -> T) -> Self {
    if rows == 0 || cols == 0 {
      return QuadRope::empty();
    }
    QuadRope::from_node(grid(ArraySlice::from_fn(rows, cols, f)))
  }
  /// Builds a rope from rows of values. All rows must have the same
  /// length.
  pub fn from_array_2d(rows: Vec<Vec<T>>) -> Result<Self> {
    let h = rows.len();
    let w = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != w) {
      return Err(Error::InvalidArgument {
        reason: format!("ragged input: a row has {} cells, expected {}", bad.len(), w),
      });
    }
    if h == 0 || w == 0 {
      return Ok(QuadRope::empty());
    }
    let cells: Vec<T> = rows.into_iter().flatten().collect();
    Ok(QuadRope::from_node(grid(ArraySlice::from_vec(h, w, cells))))
  }
  /// Builds a rope of width `w` from a flat row-major array. The length
  /// must be a multiple of `w`.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::from_flat_array(vec![1, 2, 3, 4, 5, 6], 3).unwrap();
  /// assert_eq!(2, r.rows());
  /// assert_eq!(Ok(&6), r.get(1, 2));
  /// ```
  pub fn from_flat_array(values: Vec<T>, w: usize) -> Result<Self> {
    if values.is_empty() {
      return Ok(QuadRope::empty());
    }
    if w == 0 || values.len() % w != 0 {
      return Err(Error::InvalidArgument {
        reason: format!("flat array of {} cells does not tile into rows of {}", values.len(), w),
      });
    }
    let h = values.len() / w;
    Ok(QuadRope::from_node(grid(ArraySlice::from_vec(h, w, values))))
  }
  /// Returns the value at `(i, j)`.
  pub fn get(&self, i: usize, j: usize) -> Result<&T> {
    if i >= self.rows() || j >= self.cols() {
      return Err(Error::OutOfBounds {
        i_j: [i, j],
        rows_cols: [self.rows(), self.cols()],
      });
    }
    Ok(get_node(&self.root, i, j))
  }
  /// Returns a rope equal to this one except at `(i, j)`. Costs one tile
  /// copy plus a path of interior nodes; everything else is shared.
  pub fn set(&self, i: usize, j: usize, value: T) -> Result<Self> {
    if i >= self.rows() || j >= self.cols() {
      return Err(Error::OutOfBounds {
        i_j: [i, j],
        rows_cols: [self.rows(), self.cols()],
      });
    }
    Ok(QuadRope::from_node(set_node(&self.root, i, j, value)))
  }
  /// The sub-rectangle of size `h x w` whose upper-left cell is `(i, j)`.
  /// Out-of-range windows are clamped; an empty clamp yields the empty
  /// rope. Slicing is O(1) apart from re-windowed tiles.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(4, 4, |i, j| i * 4 + j);
  /// let s = r.slice(1, 1, 2, 2);
  /// assert_eq!(Ok(&5), s.get(0, 0));
  /// assert_eq!(Ok(&10), s.get(1, 1));
  /// ```
  pub fn slice(&self, i: usize, j: usize, h: usize, w: usize) -> Self {
    QuadRope::from_node(slice_node(i, j, h, w, &self.root))
  }
  /// A window of `w` columns starting at column `j`, spanning all rows.
  pub fn hslice(&self, j: usize, w: usize) -> Self {
    self.slice(0, j, self.rows(), w)
  }
  /// A window of `h` rows starting at row `i`, spanning all columns.
  pub fn vslice(&self, i: usize, h: usize) -> Self {
    self.slice(i, 0, h, self.cols())
  }
  /// Splits into the columns left of `j` and the columns from `j` on.
  pub fn hsplit2(&self, j: usize) -> (Self, Self) {
    (
      self.slice(0, 0, self.rows(), j),
      self.slice(0, j, self.rows(), self.cols().saturating_sub(j)),
    )
  }
  /// Splits into the rows above `i` and the rows from `i` down.
  pub fn vsplit2(&self, i: usize) -> (Self, Self) {
    (
      self.slice(0, 0, i, self.cols()),
      self.slice(i, 0, self.rows().saturating_sub(i), self.cols()),
    )
  }
  /// Splits into four quadrants at the midpoints, returned in reading
  /// order `(nw, ne, sw, se)`.
  pub fn split4(&self) -> (Self, Self, Self, Self) {
    let (top, bottom) = self.vsplit2(self.rows() / 2);
    let (nw, ne) = top.hsplit2(self.cols() / 2);
    let (sw, se) = bottom.hsplit2(self.cols() / 2);
    (nw, ne, sw, se)
  }
  /// The single row at index `i` as a `1 x cols` rope.
  pub fn row(&self, i: usize) -> Self {
    self.slice(i, 0, 1, self.cols())
  }
  /// The single column at index `j` as a `rows x 1` rope.
  pub fn col(&self, j: usize) -> Self {
    self.slice(0, j, self.rows(), 1)
  }
  /// Mirrors the rope along its vertical axis: each row is reversed.
  /// ```
  /// use quad_rope::QuadRope;
  /// let r = QuadRope::init(1, 4, |_, j| j);
  /// assert_eq!(vec![3, 2, 1, 0], r.hrev().to_flat_array());
  /// ```
  pub fn hrev(&self) -> Self {
    let mut tgt = LazyTarget::new(self.rows(), self.cols());
    QuadRope::from_node(hrev_node(&self.root, 0, 0, self.cols(), &mut tgt))
  }
  /// Mirrors the rope along its horizontal axis: the row order is
  /// reversed.
  pub fn vrev(&self) -> Self {
    let mut tgt = LazyTarget::new(self.rows(), self.cols());
    QuadRope::from_node(vrev_node(&self.root, 0, 0, self.rows(), &mut tgt))
  }
  /// The transposed rope: `get(i, j)` of the input equals `get(j, i)` of
  /// the result.
  pub fn transpose(&self) -> Self {
    let mut tgt = LazyTarget::new(self.cols(), self.rows());
    QuadRope::from_node(transpose_node(&self.root, 0, 0, &mut tgt))
  }
  /// Pushes all slice windows down to the tiles they view, preserving
  /// interior structure. Tile buffers are shared with the input wherever
  /// possible.
  pub fn materialize(&self) -> Self {
    QuadRope::from_node(materialize_node(&self.root))
  }
  /// Rebalances along the horizontal axis so that
  /// `fib(depth + 2) <= cols`. Content is unchanged.
  pub fn hbalance(&self) -> Self {
    QuadRope::from_node(hbalance_node(Arc::clone(&self.root)))
  }
  /// Rebalances along the vertical axis so that `fib(depth + 2) <= rows`.
  /// Content is unchanged.
  pub fn vbalance(&self) -> Self {
    QuadRope::from_node(vbalance_node(Arc::clone(&self.root)))
  }
  /// Copies the rope into one fresh dense buffer, dropping every shared
  /// tile. Sparse regions stay sparse.
  pub fn reallocate(&self) -> Self {
    self.map(T::clone)
  }
  /// Produces the rows of the rectangle as owned vectors.
  pub fn to_rows(&self) -> Vec<Vec<T>> {
    (0..self.rows())
      .map(|i| {
        let row = self.row(i);
        row.cells().cloned().collect()
      })
      .collect()
  }
  /// Produces the columns of the rectangle as owned vectors.
  pub fn to_cols(&self) -> Vec<Vec<T>> {
    (0..self.cols())
      .map(|j| {
        let col = self.col(j);
        col.cells().cloned().collect()
      })
      .collect()
  }
  /// Produces the rectangle as a list of rows.
  pub fn to_array_2d(&self) -> Vec<Vec<T>> {
    self.to_rows()
  }
  /// Produces the rectangle as a flat row-major vector.
  pub fn to_flat_array(&self) -> Vec<T> {
    let mut out = Vec::with_capacity(self.rows() * self.cols());
    for i in 0..self.rows() {
      let row = self.row(i);
      out.extend(row.cells().cloned());
    }
    out
  }
}
impl<T: Clone + PartialEq> QuadRope<T> {
  /// Concatenates two ropes side by side. Fails with `ShapeMismatch` when
  /// both are non-empty and their row counts differ. Small neighboring
  /// tiles fuse, equal-value sparse rectangles join, and the result is
  /// rebalanced, so repeated concatenation keeps depth logarithmic.
  /// ```
  /// fn main() -> Result<(), quad_rope::QuadRopeError> {
  ///   use quad_rope::QuadRope;
  ///   let a = QuadRope::create(3, 2, 0);
  ///   let b = QuadRope::init(3, 2, |i, j| i + j);
  ///   let r = a.hcat(&b)?;
  ///   assert_eq!(4, r.cols());
  ///   assert_eq!(&0, r.get(1, 0)?);
  ///   assert_eq!(&2, r.get(1, 3)?);
  ///   Ok(())
  /// }
  /// ```
  pub fn hcat(&self, other: &Self) -> Result<Self> {
    Ok(QuadRope::from_node(hcat_nodes(&self.root, &other.root)?))
  }
  /// Concatenates two ropes one above the other. Fails with
  /// `ShapeMismatch` when both are non-empty and their column counts
  /// differ.
  pub fn vcat(&self, other: &Self) -> Result<Self> {
    Ok(QuadRope::from_node(vcat_nodes(&self.root, &other.root)?))
  }
  /// Collapses every uniform region into sparse rectangles. Content is
  /// unchanged; only the representation shrinks.
  pub fn compress(&self) -> Self {
    QuadRope::from_node(compress_node(&self.root))
  }
}

/* Traits */
impl<T> Default for QuadRope<T> {
  fn default() -> Self {
    QuadRope::empty()
  }
}
impl<T: Clone + PartialEq> PartialEq for QuadRope<T> {
  /// Content equality: same shape and element-wise equal cells. The tree
  /// shapes of the two ropes play no part.
  fn eq(&self, other: &Self) -> bool {
    self.rows() == other.rows()
    && self.cols() == other.cols()
    && self.cells().zip(other.cells()).all(|(a, b)| a == b)
  }
}
impl<T: Clone + Eq> Eq for QuadRope<T> {}
impl<T: Clone + std::fmt::Display> std::fmt::Display for QuadRope<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for i in 0..self.rows() {
      let row = self.row(i);
      let mut sep = "";
      for v in row.cells() {
        write!(f, "{}{}", sep, v)?;
        sep = " ";
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

/* Tests */
#[cfg(test)]
mod api {
  use super::*;
  #[test]
  fn empty_shape() {
    let r: QuadRope<u8> = QuadRope::empty();
    assert!(r.is_empty());
    assert_eq!(0, r.rows());
    assert_eq!(0, r.cols());
    assert_eq!(0, r.depth());
  }
  #[test]
  fn create_zero_dims_yield_empty() {
    assert!(QuadRope::create(0, 5, 1u8).is_empty());
    assert!(QuadRope::create(5, 0, 1u8).is_empty());
    assert!(QuadRope::init(0, 5, |_, _| 1u8).is_empty());
  }
  #[test]
  fn init_get() -> Result<()> {
    let r = QuadRope::init(3, 4, |i, j| i * 4 + j);
    assert_eq!(&0, r.get(0, 0)?);
    assert_eq!(&7, r.get(1, 3)?);
    assert_eq!(&11, r.get(2, 3)?);
    assert!(r.get(3, 0).is_err());
    assert!(r.get(0, 4).is_err());
    Ok(())
  }
  #[test]
  fn init_large_is_tiled() {
    let r = QuadRope::init(37, 53, |i, j| i * 53 + j);
    assert!(r.depth() > 0);
    assert!(r.depth() < MAX_DEPTH);
    for (n, v) in r.cells().enumerate() {
      assert_eq!(n, *v);
    }
  }
  #[test]
  fn get_on_empty_is_out_of_bounds() {
    let r: QuadRope<u8> = QuadRope::empty();
    assert_eq!(
      Err(Error::OutOfBounds {
        i_j: [0, 0],
        rows_cols: [0, 0],
      }),
      r.get(0, 0),
    );
  }
  #[test]
  fn set_is_persistent() -> Result<()> {
    let r = QuadRope::init(5, 5, |i, j| i * 5 + j);
    let s = r.set(2, 2, 999)?;
    assert_eq!(&999, s.get(2, 2)?);
    assert_eq!(&12, r.get(2, 2)?);
    for i in 0..5 {
      for j in 0..5 {
        if (i, j) != (2, 2) {
          assert_eq!(r.get(i, j)?, s.get(i, j)?);
        }
      }
    }
    Ok(())
  }
  #[test]
  fn set_on_sparse_materializes_one_block() -> Result<()> {
    let r = QuadRope::create(10, 10, 0);
    let s = r.set(4, 7, 1)?;
    assert_eq!(&1, s.get(4, 7)?);
    assert_eq!(&0, s.get(4, 6)?);
    assert!(r.is_sparse());
    Ok(())
  }
  #[test]
  fn hcat_rows_must_agree() {
    let a = QuadRope::init(2, 2, |_, _| 0);
    let b = QuadRope::init(3, 2, |_, _| 0);
    assert_eq!(
      Err(Error::ShapeMismatch {
        op: "hcat",
        left: [2, 2],
        right: [3, 2],
      }),
      a.hcat(&b).map(|_| ()),
    );
  }
  #[test]
  fn vcat_cols_must_agree() {
    let a = QuadRope::init(2, 2, |_, _| 0);
    let b = QuadRope::init(2, 3, |_, _| 0);
    assert!(a.vcat(&b).is_err());
  }
  #[test]
  fn cat_with_empty_is_identity() -> Result<()> {
    let a = QuadRope::init(2, 2, |i, j| i + j);
    let e = QuadRope::empty();
    assert_eq!(a, a.hcat(&e)?);
    assert_eq!(a, e.vcat(&a)?);
    Ok(())
  }
  #[test]
  fn small_leaves_fuse_on_cat() -> Result<()> {
    let a = QuadRope::singleton(1);
    let b = QuadRope::singleton(2);
    let r = a.hcat(&b)?;
    assert_eq!(0, r.depth());
    assert_eq!(vec![1, 2], r.to_flat_array());
    Ok(())
  }
  #[test]
  fn sparse_cats_merge() -> Result<()> {
    let a = QuadRope::create(3, 4, 9);
    let b = QuadRope::create(3, 6, 9);
    let r = a.hcat(&b)?;
    assert_eq!(0, r.depth());
    assert_eq!(10, r.cols());
    assert!(r.is_sparse());
    Ok(())
  }
  #[test]
  fn repeated_hcat_stays_balanced() -> Result<()> {
    let mut r = QuadRope::singleton(0usize);
    for n in 1..200 {
      r = r.hcat(&QuadRope::singleton(n))?;
    }
    assert_eq!(200, r.cols());
    assert!(r.depth() < MAX_DEPTH);
    assert!(fib(r.depth() + 2) <= 200);
    assert_eq!((0..200).collect::<Vec<_>>(), r.to_flat_array());
    Ok(())
  }
  #[test]
  fn repeated_vcat_stays_balanced() -> Result<()> {
    let mut r = QuadRope::singleton(0usize);
    for n in 1..200 {
      r = r.vcat(&QuadRope::singleton(n))?;
    }
    assert_eq!(200, r.rows());
    assert!(r.depth() < MAX_DEPTH);
    assert!(fib(r.depth() + 2) <= 200);
    Ok(())
  }
  #[test]
  fn slice_clamps() {
    let r = QuadRope::init(4, 4, |i, j| i * 4 + j);
    let s = r.slice(2, 2, 10, 10);
    assert_eq!(2, s.rows());
    assert_eq!(2, s.cols());
    assert!(r.slice(9, 0, 1, 1).is_empty());
  }
  #[test]
  fn slice_full_cover_is_identity() {
    let r = fixtures::mixed(6, 4);
    let s = r.slice(0, 0, 6, 8);
    assert_eq!(r, s);
  }
  #[test]
  fn slices_compose_by_offset() {
    let r = fixtures::mixed(8, 4);
    let a = r.slice(1, 1, 6, 6).slice(1, 2, 3, 3);
    let b = r.slice(2, 3, 3, 3);
    assert_eq!(b, a);
  }
  #[test]
  fn hsplit2_vsplit2_partition() {
    let r = QuadRope::init(4, 6, |i, j| i * 6 + j);
    let (l, rt) = r.hsplit2(2);
    assert_eq!(2, l.cols());
    assert_eq!(4, rt.cols());
    let glued = l.hcat(&rt).unwrap();
    assert_eq!(r, glued);
    let (t, b) = r.vsplit2(3);
    assert_eq!(3, t.rows());
    assert_eq!(1, b.rows());
    assert_eq!(r, t.vcat(&b).unwrap());
  }
  #[test]
  fn split4_reading_order() {
    let r = QuadRope::init(4, 4, |i, j| i * 4 + j);
    let (nw, ne, sw, se) = r.split4();
    assert_eq!(vec![0, 1, 4, 5], nw.to_flat_array());
    assert_eq!(vec![2, 3, 6, 7], ne.to_flat_array());
    assert_eq!(vec![8, 9, 12, 13], sw.to_flat_array());
    assert_eq!(vec![10, 11, 14, 15], se.to_flat_array());
  }
  #[test]
  fn row_col() {
    let r = QuadRope::init(3, 3, |i, j| i * 3 + j);
    assert_eq!(vec![3, 4, 5], r.row(1).to_flat_array());
    assert_eq!(vec![2, 5, 8], r.col(2).to_flat_array());
    assert!(r.row(7).is_empty());
  }
  #[test]
  fn hrev_vrev_involutions() {
    let r = fixtures::mixed(6, 4);
    assert_eq!(r, r.hrev().hrev());
    assert_eq!(r, r.vrev().vrev());
  }
  #[test]
  fn hrev_reverses_rows() {
    let r = QuadRope::init(2, 5, |i, j| i * 5 + j);
    assert_eq!(vec![4, 3, 2, 1, 0, 9, 8, 7, 6, 5], r.hrev().to_flat_array());
  }
  #[test]
  fn vrev_reverses_row_order() {
    let r = QuadRope::init(3, 2, |i, j| i * 2 + j);
    assert_eq!(vec![4, 5, 2, 3, 0, 1], r.vrev().to_flat_array());
  }
  #[test]
  fn sparse_invariant_under_rev() {
    let r = QuadRope::create(5, 9, 3);
    assert_eq!(0, r.hrev().depth());
    assert!(r.hrev().is_sparse());
    assert_eq!(r, r.hrev());
    assert_eq!(r, r.vrev());
  }
  #[test]
  fn transpose_swaps_axes() -> Result<()> {
    let r = QuadRope::init(3, 5, |i, j| (i, j));
    let t = r.transpose();
    assert_eq!(5, t.rows());
    assert_eq!(3, t.cols());
    for i in 0..3 {
      for j in 0..5 {
        assert_eq!(r.get(i, j)?, t.get(j, i)?);
      }
    }
    assert_eq!(r, t.transpose());
    Ok(())
  }
  #[test]
  fn materialize_flattens_slices() {
    let r = fixtures::mixed(8, 6).slice(1, 2, 5, 7);
    let m = r.materialize();
    assert_eq!(r, m);
  }
  #[test]
  fn balance_preserves_content() {
    let r = fixtures::mixed(8, 6);
    assert_eq!(r, r.hbalance());
    assert_eq!(r, r.vbalance());
  }
  #[test]
  fn compress_finds_uniform_tiles() {
    let r = QuadRope::init(6, 6, |_, _| 5);
    let c = r.compress();
    assert!(c.is_sparse());
    assert_eq!(0, c.depth());
    assert_eq!(r, c);
  }
  #[test]
  fn compress_keeps_distinct_cells() {
    let r = QuadRope::init(4, 4, |i, j| i * 4 + j);
    let c = r.compress();
    assert_eq!(r, c);
    assert!(!c.is_sparse());
  }
  #[test]
  fn from_array_2d_round_trip() -> Result<()> {
    let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
    let r = QuadRope::from_array_2d(rows.clone())?;
    assert_eq!(rows, r.to_array_2d());
    Ok(())
  }
  #[test]
  fn from_array_2d_rejects_ragged() {
    let rows = vec![vec![1, 2], vec![3]];
    assert!(QuadRope::from_array_2d(rows).is_err());
  }
  #[test]
  fn from_flat_array_rejects_remainder() {
    assert!(QuadRope::from_flat_array(vec![1, 2, 3], 2).is_err());
    assert!(QuadRope::from_flat_array(Vec::<u8>::new(), 0).unwrap().is_empty());
  }
  #[test]
  fn to_cols_transposes_rows() {
    let r = QuadRope::init(2, 3, |i, j| i * 3 + j);
    assert_eq!(vec![vec![0, 3], vec![1, 4], vec![2, 5]], r.to_cols());
  }
  #[test]
  fn display_renders_grid() {
    let r = QuadRope::init(2, 2, |i, j| i * 2 + j);
    assert_eq!("0 1\n2 3\n", format!("{}", r));
  }
  #[test]
  fn content_eq_ignores_structure() -> Result<()> {
    let a = QuadRope::init(2, 4, |i, j| i * 4 + j);
    let l = QuadRope::init(2, 2, |i, j| i * 4 + j);
    let r = QuadRope::init(2, 2, |i, j| i * 4 + j + 2);
    assert_eq!(a, l.hcat(&r)?);
    Ok(())
  }
}
