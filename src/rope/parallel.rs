/*!
Fork-join overlay: structural recursion into cat children runs on rayon
workers, falling back to the sequential layer at tile and sparse
granularity. Sibling tasks write disjoint windows of one shared target
buffer, so joining needs no locks; results recombine through the ordinary
pseudo-constructors after the join.
*/

use std::sync::Arc;

use super::bulk::{
  combine_partial, hfilter_node, hmapreduce_node, mapreduce_node, vfilter_node, vmapreduce_node,
  zip_node,
};
use crate::error::QuadRopeError as Error;
use crate::rope::{
  empty_node, get_node, grid, hnode, leaf, materialize_node, slice_node, sparse_node, vnode, Node,
  QuadRope, MAX_TILE_EDGE,
};
use crate::slice::ArraySlice;
use crate::target::{LazyTarget, Target};

type Result<T> = std::result::Result<T, Error>;

/// Subtrees of at most one tile's worth of cells run sequentially.
const SEQ_CUTOFF: usize = MAX_TILE_EDGE * MAX_TILE_EDGE;

/// Evaluates two thunks concurrently and waits for both.
pub(crate) fn par2<A: Send, B: Send>(
  f: impl FnOnce() -> A + Send,
  g: impl FnOnce() -> B + Send,
) -> (A, B) {
  rayon::join(f, g)
}
/// Evaluates four thunks concurrently and waits for all of them.
pub(crate) fn par4<A: Send, B: Send, C: Send, D: Send>(
  f: impl FnOnce() -> A + Send,
  g: impl FnOnce() -> B + Send,
  h: impl FnOnce() -> C + Send,
  k: impl FnOnce() -> D + Send,
) -> (A, B, C, D) {
  let ((a, b), (c, d)) = rayon::join(|| rayon::join(f, g), || rayon::join(h, k));
  (a, b, c, d)
}

fn small<T>(node: &Node<T>) -> bool {
  node.rows() * node.cols() <= SEQ_CUTOFF
}
fn has_dense<T>(node: &Node<T>) -> bool {
  match node {
    Node::Leaf(_) => true,
    Node::Empty | Node::Sparse { .. } => false,
    Node::HCat { left, right, .. } => has_dense(left) || has_dense(right),
    Node::VCat { top, bottom, .. } => has_dense(top) || has_dense(bottom),
    Node::Slice { inner, .. } => has_dense(inner),
  }
}

/* Map */

fn par_map_node<T, U>(
  node: &Arc<Node<T>>,
  f: &(impl Fn(&T) -> U + Sync),
  i: usize,
  j: usize,
  tgt: Option<&Target<U>>,
) -> Arc<Node<U>>
where
  T: Clone + Send + Sync,
  U: Clone + Send + Sync,
{
  match &**node {
    Node::Empty => empty_node(),
    Node::Sparse { rows, cols, value } => sparse_node(*rows, *cols, f(value)),
    Node::Leaf(s) => match tgt {
      Some(t0) => {
        let (h, w) = (s.rows(), s.cols());
        let t = t0.offset(i, j);
        for r in 0..h {
          for c in 0..w {
            t.write(r, c, f(s.get(r, c)));
          }
        }
        leaf(t.freeze(h, w))
      }
      None => leaf(s.map(f)),
    },
    Node::HCat { left, right, .. } => {
      if small(node) {
        let a = par_map_node(left, f, i, j, tgt);
        let b = par_map_node(right, f, i, j + left.cols(), tgt);
        hnode(a, b)
      } else {
        let (a, b) = par2(
          || par_map_node(left, f, i, j, tgt),
          || par_map_node(right, f, i, j + left.cols(), tgt),
        );
        hnode(a, b)
      }
    }
    Node::VCat { top, bottom, .. } => {
      if small(node) {
        let a = par_map_node(top, f, i, j, tgt);
        let b = par_map_node(bottom, f, i + top.rows(), j, tgt);
        vnode(a, b)
      } else {
        let (a, b) = par2(
          || par_map_node(top, f, i, j, tgt),
          || par_map_node(bottom, f, i + top.rows(), j, tgt),
        );
        vnode(a, b)
      }
    }
    Node::Slice { .. } => par_map_node(&materialize_node(node), f, i, j, tgt),
  }
}

/* Zip */

fn par_zip_node<T, U, V>(
  a: &Arc<Node<T>>,
  b: &Arc<Node<U>>,
  f: &(impl Fn(&T, &U) -> V + Sync),
  i: usize,
  j: usize,
  tgt: Option<&Target<V>>,
) -> Arc<Node<V>>
where
  T: Clone + Send + Sync,
  U: Clone + Send + Sync,
  V: Clone + Send + Sync,
{
  debug_assert!(a.rows() == b.rows() && a.cols() == b.cols());
  match (&**a, &**b) {
    (Node::Empty, _) => empty_node(),
    (
      Node::Sparse {
        rows, cols, value: v1,
      },
      Node::Sparse { value: v2, .. },
    ) => sparse_node(*rows, *cols, f(v1, v2)),
    (Node::Sparse { value: v1, .. }, _) => par_map_node(b, &|x: &U| f(v1, x), i, j, tgt),
    (_, Node::Sparse { value: v2, .. }) => par_map_node(a, &|x: &T| f(x, v2), i, j, tgt),
    (Node::Leaf(s1), Node::Leaf(s2)) => match tgt {
      Some(t0) => {
        let (h, w) = (s1.rows(), s1.cols());
        let t = t0.offset(i, j);
        for r in 0..h {
          for c in 0..w {
            t.write(r, c, f(s1.get(r, c), s2.get(r, c)));
          }
        }
        leaf(t.freeze(h, w))
      }
      None => leaf(s1.map2(s2, f)),
    },
    (
      Node::HCat {
        left: a1, right: a2, ..
      },
      Node::HCat {
        left: b1, right: b2, ..
      },
    ) if a1.cols() == b1.cols() => {
      let jr = j + a1.cols();
      if small(a) {
        hnode(
          par_zip_node(a1, b1, f, i, j, tgt),
          par_zip_node(a2, b2, f, i, jr, tgt),
        )
      } else {
        let (l, r) = par2(
          || par_zip_node(a1, b1, f, i, j, tgt),
          || par_zip_node(a2, b2, f, i, jr, tgt),
        );
        hnode(l, r)
      }
    }
    (
      Node::VCat {
        top: a1, bottom: a2, ..
      },
      Node::VCat {
        top: b1, bottom: b2, ..
      },
    ) if a1.rows() == b1.rows() => {
      let ib = i + a1.rows();
      if small(a) {
        vnode(
          par_zip_node(a1, b1, f, i, j, tgt),
          par_zip_node(a2, b2, f, ib, j, tgt),
        )
      } else {
        let (t, u) = par2(
          || par_zip_node(a1, b1, f, i, j, tgt),
          || par_zip_node(a2, b2, f, ib, j, tgt),
        );
        vnode(t, u)
      }
    }
    (Node::Slice { .. }, _) => par_zip_node(&materialize_node(a), b, f, i, j, tgt),
    (_, Node::Slice { .. }) => par_zip_node(a, &materialize_node(b), f, i, j, tgt),
    (Node::HCat { left, right, .. }, _) => {
      let lw = left.cols();
      let b1 = slice_node(0, 0, b.rows(), lw, b);
      let b2 = slice_node(0, lw, b.rows(), b.cols() - lw, b);
      if small(a) {
        hnode(
          par_zip_node(left, &b1, f, i, j, tgt),
          par_zip_node(right, &b2, f, i, j + lw, tgt),
        )
      } else {
        let (l, r) = par2(
          || par_zip_node(left, &b1, f, i, j, tgt),
          || par_zip_node(right, &b2, f, i, j + lw, tgt),
        );
        hnode(l, r)
      }
    }
    (Node::VCat { top, bottom, .. }, _) => {
      let th = top.rows();
      let b1 = slice_node(0, 0, th, b.cols(), b);
      let b2 = slice_node(th, 0, b.rows() - th, b.cols(), b);
      if small(a) {
        vnode(
          par_zip_node(top, &b1, f, i, j, tgt),
          par_zip_node(bottom, &b2, f, i + th, j, tgt),
        )
      } else {
        let (t, u) = par2(
          || par_zip_node(top, &b1, f, i, j, tgt),
          || par_zip_node(bottom, &b2, f, i + th, j, tgt),
        );
        vnode(t, u)
      }
    }
    (Node::Leaf(s1), _) => {
      let (h, w) = (s1.rows(), s1.cols());
      match tgt {
        Some(t0) => {
          let t = t0.offset(i, j);
          for r in 0..h {
            for c in 0..w {
              t.write(r, c, f(s1.get(r, c), get_node(b, r, c)));
            }
          }
          leaf(t.freeze(h, w))
        }
        None => leaf(ArraySlice::from_fn(h, w, |r, c| {
          f(s1.get(r, c), get_node(b, r, c))
        })),
      }
    }
  }
}

/* Reduce */

fn par_mapreduce_node<T, U>(
  node: &Arc<Node<T>>,
  g: &(impl Fn(&T) -> U + Sync),
  f: &(impl Fn(&U, &U) -> U + Sync),
) -> Option<U>
where
  T: Clone + Send + Sync,
  U: Clone + Send,
{
  if small(node) {
    return mapreduce_node(node, g, f);
  }
  match &**node {
    Node::HCat { left, right, .. } => {
      let (a, b) = par2(
        || par_mapreduce_node(left, g, f),
        || par_mapreduce_node(right, g, f),
      );
      combine_partial(f, a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let (a, b) = par2(
        || par_mapreduce_node(top, g, f),
        || par_mapreduce_node(bottom, g, f),
      );
      combine_partial(f, a, b)
    }
    Node::Slice { .. } => par_mapreduce_node(&materialize_node(node), g, f),
    _ => mapreduce_node(node, g, f),
  }
}

/* Row and column reductions */

fn par_hmapreduce_node<T, U>(
  node: &Arc<Node<T>>,
  g: &(impl Fn(&T) -> U + Sync),
  f: &(impl Fn(&U, &U) -> U + Sync),
) -> Arc<Node<U>>
where
  T: Clone + Send + Sync,
  U: Clone + Send + Sync,
{
  if small(node) {
    return hmapreduce_node(node, g, f);
  }
  match &**node {
    Node::VCat { top, bottom, .. } => {
      let (a, b) = par2(
        || par_hmapreduce_node(top, g, f),
        || par_hmapreduce_node(bottom, g, f),
      );
      vnode(a, b)
    }
    Node::HCat { left, right, .. } => {
      let (a, b) = par2(
        || par_hmapreduce_node(left, g, f),
        || par_hmapreduce_node(right, g, f),
      );
      let mut tgt = LazyTarget::new(a.rows(), 1);
      zip_node(&a, &b, &|x: &U, y: &U| f(x, y), 0, 0, &mut tgt)
    }
    Node::Slice { .. } => par_hmapreduce_node(&materialize_node(node), g, f),
    _ => hmapreduce_node(node, g, f),
  }
}
fn par_vmapreduce_node<T, U>(
  node: &Arc<Node<T>>,
  g: &(impl Fn(&T) -> U + Sync),
  f: &(impl Fn(&U, &U) -> U + Sync),
) -> Arc<Node<U>>
where
  T: Clone + Send + Sync,
  U: Clone + Send + Sync,
{
  if small(node) {
    return vmapreduce_node(node, g, f);
  }
  match &**node {
    Node::HCat { left, right, .. } => {
      let (a, b) = par2(
        || par_vmapreduce_node(left, g, f),
        || par_vmapreduce_node(right, g, f),
      );
      hnode(a, b)
    }
    Node::VCat { top, bottom, .. } => {
      let (a, b) = par2(
        || par_vmapreduce_node(top, g, f),
        || par_vmapreduce_node(bottom, g, f),
      );
      let mut tgt = LazyTarget::new(1, a.cols());
      zip_node(&a, &b, &|x: &U, y: &U| f(x, y), 0, 0, &mut tgt)
    }
    Node::Slice { .. } => par_vmapreduce_node(&materialize_node(node), g, f),
    _ => vmapreduce_node(node, g, f),
  }
}

/* Filter */

fn par_hfilter_node<T: Clone + Send + Sync>(
  node: &Arc<Node<T>>,
  p: &(impl Fn(&T) -> bool + Sync),
) -> Arc<Node<T>> {
  if small(node) {
    return hfilter_node(node, p);
  }
  match &**node {
    Node::HCat { left, right, .. } => {
      let (a, b) = par2(|| par_hfilter_node(left, p), || par_hfilter_node(right, p));
      hnode(a, b)
    }
    Node::Slice { .. } => par_hfilter_node(&materialize_node(node), p),
    _ => hfilter_node(node, p),
  }
}
fn par_vfilter_node<T: Clone + Send + Sync>(
  node: &Arc<Node<T>>,
  p: &(impl Fn(&T) -> bool + Sync),
) -> Arc<Node<T>> {
  if small(node) {
    return vfilter_node(node, p);
  }
  match &**node {
    Node::VCat { top, bottom, .. } => {
      let (a, b) = par2(|| par_vfilter_node(top, p), || par_vfilter_node(bottom, p));
      vnode(a, b)
    }
    Node::Slice { .. } => par_vfilter_node(&materialize_node(node), p),
    _ => vfilter_node(node, p),
  }
}

/* Reverse and transpose */

fn par_hrev_node<T: Clone + Send + Sync>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  total_cols: usize,
  tgt: Option<&Target<T>>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty | Node::Sparse { .. } => Arc::clone(node),
    Node::Leaf(s) => match tgt {
      Some(t0) => {
        let (h, w) = (s.rows(), s.cols());
        let t = t0.offset(i, total_cols - j - w);
        for r in 0..h {
          for c in 0..w {
            t.write(r, c, s.get(r, w - 1 - c).clone());
          }
        }
        leaf(t.freeze(h, w))
      }
      None => leaf(s.hrev()),
    },
    Node::HCat { left, right, .. } => {
      let jr = j + left.cols();
      if small(node) {
        let b = par_hrev_node(right, i, jr, total_cols, tgt);
        let a = par_hrev_node(left, i, j, total_cols, tgt);
        hnode(b, a)
      } else {
        let (b, a) = par2(
          || par_hrev_node(right, i, jr, total_cols, tgt),
          || par_hrev_node(left, i, j, total_cols, tgt),
        );
        hnode(b, a)
      }
    }
    Node::VCat { top, bottom, .. } => {
      let ib = i + top.rows();
      if small(node) {
        let a = par_hrev_node(top, i, j, total_cols, tgt);
        let b = par_hrev_node(bottom, ib, j, total_cols, tgt);
        vnode(a, b)
      } else {
        let (a, b) = par2(
          || par_hrev_node(top, i, j, total_cols, tgt),
          || par_hrev_node(bottom, ib, j, total_cols, tgt),
        );
        vnode(a, b)
      }
    }
    Node::Slice { .. } => par_hrev_node(&materialize_node(node), i, j, total_cols, tgt),
  }
}
fn par_vrev_node<T: Clone + Send + Sync>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  total_rows: usize,
  tgt: Option<&Target<T>>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty | Node::Sparse { .. } => Arc::clone(node),
    Node::Leaf(s) => match tgt {
      Some(t0) => {
        let (h, w) = (s.rows(), s.cols());
        let t = t0.offset(total_rows - i - h, j);
        for r in 0..h {
          for c in 0..w {
            t.write(r, c, s.get(h - 1 - r, c).clone());
          }
        }
        leaf(t.freeze(h, w))
      }
      None => leaf(s.vrev()),
    },
    Node::VCat { top, bottom, .. } => {
      let ib = i + top.rows();
      if small(node) {
        let b = par_vrev_node(bottom, ib, j, total_rows, tgt);
        let a = par_vrev_node(top, i, j, total_rows, tgt);
        vnode(b, a)
      } else {
        let (b, a) = par2(
          || par_vrev_node(bottom, ib, j, total_rows, tgt),
          || par_vrev_node(top, i, j, total_rows, tgt),
        );
        vnode(b, a)
      }
    }
    Node::HCat { left, right, .. } => {
      let jr = j + left.cols();
      if small(node) {
        let a = par_vrev_node(left, i, j, total_rows, tgt);
        let b = par_vrev_node(right, i, jr, total_rows, tgt);
        hnode(a, b)
      } else {
        let (a, b) = par2(
          || par_vrev_node(left, i, j, total_rows, tgt),
          || par_vrev_node(right, i, jr, total_rows, tgt),
        );
        hnode(a, b)
      }
    }
    Node::Slice { .. } => par_vrev_node(&materialize_node(node), i, j, total_rows, tgt),
  }
}
fn par_transpose_node<T: Clone + Send + Sync>(
  node: &Arc<Node<T>>,
  i: usize,
  j: usize,
  tgt: Option<&Target<T>>,
) -> Arc<Node<T>> {
  match &**node {
    Node::Empty => empty_node(),
    Node::Sparse { rows, cols, value } => sparse_node(*cols, *rows, value.clone()),
    Node::Leaf(s) => match tgt {
      Some(t0) => {
        let (h, w) = (s.rows(), s.cols());
        let t = t0.offset(j, i);
        for c in 0..w {
          for r in 0..h {
            t.write(c, r, s.get(r, c).clone());
          }
        }
        leaf(t.freeze(w, h))
      }
      None => leaf(s.transpose()),
    },
    Node::HCat { left, right, .. } => {
      let jr = j + left.cols();
      if small(node) {
        let a = par_transpose_node(left, i, j, tgt);
        let b = par_transpose_node(right, i, jr, tgt);
        vnode(a, b)
      } else {
        let (a, b) = par2(
          || par_transpose_node(left, i, j, tgt),
          || par_transpose_node(right, i, jr, tgt),
        );
        vnode(a, b)
      }
    }
    Node::VCat { top, bottom, .. } => {
      let ib = i + top.rows();
      if small(node) {
        let a = par_transpose_node(top, i, j, tgt);
        let b = par_transpose_node(bottom, ib, j, tgt);
        hnode(a, b)
      } else {
        let (a, b) = par2(
          || par_transpose_node(top, i, j, tgt),
          || par_transpose_node(bottom, ib, j, tgt),
        );
        hnode(a, b)
      }
    }
    Node::Slice { .. } => par_transpose_node(&materialize_node(node), i, j, tgt),
  }
}

/* Init */

fn par_fill<T: Clone + Send + Sync>(
  tgt: &Target<T>,
  i0: usize,
  j0: usize,
  h: usize,
  w: usize,
  f: &(impl Fn(usize, usize) -> T + Sync),
) {
  if h * w <= SEQ_CUTOFF || (h < 2 && w < 2) {
    for r in 0..h {
      for c in 0..w {
        tgt.write(i0 + r, j0 + c, f(i0 + r, j0 + c));
      }
    }
  } else if h < 2 {
    let half = w / 2;
    par2(
      || par_fill(tgt, i0, j0, h, half, f),
      || par_fill(tgt, i0, j0 + half, h, w - half, f),
    );
  } else if w < 2 {
    let half = h / 2;
    par2(
      || par_fill(tgt, i0, j0, half, w, f),
      || par_fill(tgt, i0 + half, j0, h - half, w, f),
    );
  } else {
    let (hh, hw) = (h / 2, w / 2);
    par4(
      || par_fill(tgt, i0, j0, hh, hw, f),
      || par_fill(tgt, i0, j0 + hw, hh, w - hw, f),
      || par_fill(tgt, i0 + hh, j0, h - hh, hw, f),
      || par_fill(tgt, i0 + hh, j0 + hw, h - hh, w - hw, f),
    );
  }
}

/* Cooperative map */

/// Outcome of [`QuadRope::map_until`].
#[derive(Debug, Clone, PartialEq)]
pub enum Progress<D, R> {
  /// The whole rope was processed.
  Done(D),
  /// Processing was interrupted. `mapped` holds the finished leading
  /// band, `rest` the untouched remainder; mapping `rest` later and
  /// concatenating the two reproduces the full result.
  More {
    ///
    mapped: D,
    ///
    rest: R,
  },
}

// Cuts must keep both pieces rectangular so the remainder can be fed
// back in. Multi-row ropes cut between row bands; a single-row rope cuts
// between column runs, but only at the root: a one-row band inside a
// taller rope maps atomically so every interior cut spans the full width.
fn map_until_rec<T: Clone, U: Clone>(
  rope: &QuadRope<T>,
  cond: &impl Fn() -> bool,
  f: &impl Fn(&T) -> U,
  vertical_cuts: bool,
) -> Progress<QuadRope<U>, QuadRope<T>> {
  if rope.rows() * rope.cols() <= SEQ_CUTOFF {
    return Progress::Done(rope.map(f));
  }
  if rope.rows() >= 2 {
    let (top, bottom) = rope.vsplit2(rope.rows() / 2);
    match map_until_rec(&top, cond, f, false) {
      Progress::More { mapped, rest } => Progress::More {
        mapped,
        rest: glue_v(&rest, &bottom),
      },
      Progress::Done(m) => {
        if cond() {
          return Progress::More {
            mapped: m,
            rest: bottom,
          };
        }
        match map_until_rec(&bottom, cond, f, false) {
          Progress::Done(mb) => Progress::Done(glue_v(&m, &mb)),
          Progress::More { mapped, rest } => Progress::More {
            mapped: glue_v(&m, &mapped),
            rest,
          },
        }
      }
    }
  } else if vertical_cuts {
    let (left, right) = rope.hsplit2(rope.cols() / 2);
    match map_until_rec(&left, cond, f, true) {
      Progress::More { mapped, rest } => Progress::More {
        mapped,
        rest: glue_h(&rest, &right),
      },
      Progress::Done(m) => {
        if cond() {
          return Progress::More {
            mapped: m,
            rest: right,
          };
        }
        match map_until_rec(&right, cond, f, true) {
          Progress::Done(mr) => Progress::Done(glue_h(&m, &mr)),
          Progress::More { mapped, rest } => Progress::More {
            mapped: glue_h(&m, &mapped),
            rest,
          },
        }
      }
    }
  } else {
    Progress::Done(rope.map(f))
  }
}
fn glue_v<T: Clone>(a: &QuadRope<T>, b: &QuadRope<T>) -> QuadRope<T> {
  QuadRope::from_node(vnode(Arc::clone(a.node()), Arc::clone(b.node())))
}
fn glue_h<T: Clone>(a: &QuadRope<T>, b: &QuadRope<T>) -> QuadRope<T> {
  QuadRope::from_node(hnode(Arc::clone(a.node()), Arc::clone(b.node())))
}

/* Public */
impl<T: Clone + Send + Sync> QuadRope<T> {
  /// Parallel [`init`](QuadRope::init): quadrants of the rectangle are
  /// generated on rayon workers, all writing disjoint windows of one
  /// buffer.
  pub fn par_init(rows: usize, cols: usize, f: impl Fn(usize, usize) -> T + Sync) -> Self {
    if rows == 0 || cols == 0 {
      return QuadRope::empty();
    }
    let tgt = Target::make(rows, cols, f(0, 0));
    par_fill(&tgt, 0, 0, rows, cols, &f);
    QuadRope::from_node(grid(tgt.freeze(rows, cols)))
  }
  /// Parallel [`map`](QuadRope::map). Content-equal to the sequential
  /// result.
  pub fn par_map<U: Clone + Send + Sync>(&self, f: impl Fn(&T) -> U + Sync) -> QuadRope<U> {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = if has_dense(self.node()) {
      Some(Target::make(
        self.rows(),
        self.cols(),
        f(get_node(self.node(), 0, 0)),
      ))
    } else {
      None
    };
    QuadRope::from_node(par_map_node(self.node(), &f, 0, 0, tgt.as_ref()))
  }
  /// Parallel [`zip`](QuadRope::zip).
  pub fn par_zip<U, V>(
    &self,
    other: &QuadRope<U>,
    f: impl Fn(&T, &U) -> V + Sync,
  ) -> Result<QuadRope<V>>
  where
    U: Clone + Send + Sync,
    V: Clone + Send + Sync,
  {
    if self.rows() != other.rows() || self.cols() != other.cols() {
      return Err(Error::ShapeMismatch {
        op: "zip",
        left: [self.rows(), self.cols()],
        right: [other.rows(), other.cols()],
      });
    }
    if self.is_empty() {
      return Ok(QuadRope::empty());
    }
    let tgt = if has_dense(self.node()) || has_dense(other.node()) {
      Some(Target::make(
        self.rows(),
        self.cols(),
        f(get_node(self.node(), 0, 0), get_node(other.node(), 0, 0)),
      ))
    } else {
      None
    };
    Ok(QuadRope::from_node(par_zip_node(
      self.node(),
      other.node(),
      &f,
      0,
      0,
      tgt.as_ref(),
    )))
  }
  /// Parallel [`mapreduce`](QuadRope::mapreduce).
  pub fn par_mapreduce<U: Clone + Send>(
    &self,
    g: impl Fn(&T) -> U + Sync,
    f: impl Fn(&U, &U) -> U + Sync,
    epsilon: U,
  ) -> U {
    par_mapreduce_node(self.node(), &g, &f).unwrap_or(epsilon)
  }
  /// Parallel [`reduce`](QuadRope::reduce).
  pub fn par_reduce(&self, f: impl Fn(&T, &T) -> T + Sync, epsilon: T) -> T {
    self.par_mapreduce(T::clone, f, epsilon)
  }
  /// Parallel [`hmapreduce`](QuadRope::hmapreduce).
  pub fn par_hmapreduce<U: Clone + Send + Sync>(
    &self,
    g: impl Fn(&T) -> U + Sync,
    f: impl Fn(&U, &U) -> U + Sync,
  ) -> QuadRope<U> {
    QuadRope::from_node(par_hmapreduce_node(self.node(), &g, &f))
  }
  /// Parallel [`vmapreduce`](QuadRope::vmapreduce).
  pub fn par_vmapreduce<U: Clone + Send + Sync>(
    &self,
    g: impl Fn(&T) -> U + Sync,
    f: impl Fn(&U, &U) -> U + Sync,
  ) -> QuadRope<U> {
    QuadRope::from_node(par_vmapreduce_node(self.node(), &g, &f))
  }
  /// Parallel [`hreduce`](QuadRope::hreduce).
  pub fn par_hreduce(&self, f: impl Fn(&T, &T) -> T + Sync) -> Self {
    self.par_hmapreduce(T::clone, f)
  }
  /// Parallel [`vreduce`](QuadRope::vreduce).
  pub fn par_vreduce(&self, f: impl Fn(&T, &T) -> T + Sync) -> Self {
    self.par_vmapreduce(T::clone, f)
  }
  /// Parallel [`hfilter`](QuadRope::hfilter).
  pub fn par_hfilter(&self, p: impl Fn(&T) -> bool + Sync) -> Result<Self> {
    if self.rows() != 1 {
      return Err(Error::ShapeMismatch {
        op: "hfilter",
        left: [self.rows(), self.cols()],
        right: [1, self.cols()],
      });
    }
    Ok(QuadRope::from_node(par_hfilter_node(self.node(), &p)))
  }
  /// Parallel [`vfilter`](QuadRope::vfilter).
  pub fn par_vfilter(&self, p: impl Fn(&T) -> bool + Sync) -> Result<Self> {
    if self.cols() != 1 {
      return Err(Error::ShapeMismatch {
        op: "vfilter",
        left: [self.rows(), self.cols()],
        right: [self.rows(), 1],
      });
    }
    Ok(QuadRope::from_node(par_vfilter_node(self.node(), &p)))
  }
  /// Parallel [`hrev`](QuadRope::hrev).
  pub fn par_hrev(&self) -> Self {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = self.rev_target();
    QuadRope::from_node(par_hrev_node(self.node(), 0, 0, self.cols(), tgt.as_ref()))
  }
  /// Parallel [`vrev`](QuadRope::vrev).
  pub fn par_vrev(&self) -> Self {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = self.rev_target();
    QuadRope::from_node(par_vrev_node(self.node(), 0, 0, self.rows(), tgt.as_ref()))
  }
  /// Parallel [`transpose`](QuadRope::transpose).
  pub fn par_transpose(&self) -> Self {
    if self.is_empty() {
      return QuadRope::empty();
    }
    let tgt = if has_dense(self.node()) {
      Some(Target::make(
        self.cols(),
        self.rows(),
        get_node(self.node(), 0, 0).clone(),
      ))
    } else {
      None
    };
    QuadRope::from_node(par_transpose_node(self.node(), 0, 0, tgt.as_ref()))
  }
  fn rev_target(&self) -> Option<Target<T>> {
    if has_dense(self.node()) {
      Some(Target::make(
        self.rows(),
        self.cols(),
        get_node(self.node(), 0, 0).clone(),
      ))
    } else {
      None
    }
  }
}
impl<T: Clone> QuadRope<T> {
  /// Maps the rope in reading order, consulting `cond` between
  /// sub-blocks. When `cond` turns true, returns the finished leading
  /// band and the untouched remainder; feeding the remainder through a
  /// later map and concatenating reproduces the full result. The cut is
  /// horizontal across the full width, or vertical when the rope is a
  /// single row. The predicate is the only cancellation signal; there is
  /// no asynchronous interruption.
  pub fn map_until<U: Clone>(
    &self,
    cond: impl Fn() -> bool,
    f: impl Fn(&T) -> U,
  ) -> Progress<QuadRope<U>, QuadRope<T>> {
    map_until_rec(self, &cond, &f, true)
  }
}

/* Tests */
#[cfg(test)]
mod api {
  use super::*;
  use crate::rope::fixtures;
  #[test]
  fn par_init_agrees() {
    let seq = QuadRope::init(33, 21, |i, j| i * 100 + j);
    let par = QuadRope::par_init(33, 21, |i, j| i * 100 + j);
    assert_eq!(seq, par);
  }
  #[test]
  fn par_map_agrees() {
    let r = fixtures::mixed(20, 10);
    assert_eq!(r.map(|v| v * 3), r.par_map(|v| v * 3));
  }
  #[test]
  fn par_map_keeps_sparse() {
    let r = QuadRope::create(50, 50, 4);
    let m = r.par_map(|v| v + 1);
    assert_eq!(0, m.depth());
    assert!(m.is_sparse());
  }
  #[test]
  fn par_zip_agrees() {
    let a = fixtures::mixed(16, 8);
    let b = a.transpose().transpose();
    let seq = a.zip(&b, |x, y| x * y).unwrap();
    let par = a.par_zip(&b, |x, y| x * y).unwrap();
    assert_eq!(seq, par);
  }
  #[test]
  fn par_zip_mismatched_structure_agrees() {
    let a = QuadRope::init(8, 4, |i, j| (i * 4 + j) as i64)
      .hcat(&QuadRope::init(8, 8, |i, j| (i + j) as i64))
      .unwrap();
    let b = QuadRope::init(4, 12, |i, j| (i * 12 + j) as i64)
      .vcat(&QuadRope::init(4, 12, |i, j| (i + j) as i64))
      .unwrap();
    let seq = a.zip(&b, |x, y| x + y).unwrap();
    let par = a.par_zip(&b, |x, y| x + y).unwrap();
    assert_eq!(seq, par);
  }
  #[test]
  fn par_reduce_agrees() {
    let r = fixtures::mixed(20, 10);
    assert_eq!(
      r.reduce(|a, b| a + b, 0),
      r.par_reduce(|a, b| a + b, 0),
    );
  }
  #[test]
  fn par_hreduce_vreduce_agree() {
    let r = fixtures::mixed(20, 10);
    assert_eq!(r.hreduce(|a, b| a + b), r.par_hreduce(|a, b| a + b));
    assert_eq!(r.vreduce(|a, b| a + b), r.par_vreduce(|a, b| a + b));
  }
  #[test]
  fn par_filters_agree() {
    let r = QuadRope::init(1, 100, |_, j| j);
    assert_eq!(
      r.hfilter(|v| v % 3 == 0).unwrap(),
      r.par_hfilter(|v| v % 3 == 0).unwrap(),
    );
    let c = QuadRope::init(100, 1, |i, _| i);
    assert_eq!(
      c.vfilter(|v| v % 3 == 0).unwrap(),
      c.par_vfilter(|v| v % 3 == 0).unwrap(),
    );
  }
  #[test]
  fn par_rev_transpose_agree() {
    let r = fixtures::mixed(18, 6);
    assert_eq!(r.hrev(), r.par_hrev());
    assert_eq!(r.vrev(), r.par_vrev());
    assert_eq!(r.transpose(), r.par_transpose());
  }
  #[test]
  fn map_until_without_interruption() {
    let r = QuadRope::init(16, 16, |i, j| i * 16 + j);
    match r.map_until(|| false, |v| v + 1) {
      Progress::Done(m) => assert_eq!(r.map(|v| v + 1), m),
      Progress::More { .. } => panic!("no interruption requested"),
    }
  }
  #[test]
  fn map_until_resumes_cleanly() {
    let r = QuadRope::init(64, 32, |i, j| (i * 32 + j) as i64);
    let polls = std::cell::Cell::new(0usize);
    let progress = r.map_until(
      || {
        polls.set(polls.get() + 1);
        polls.get() >= 1
      },
      |v| v * 2,
    );
    match progress {
      Progress::More { mapped, rest } => {
        assert_eq!(r.cols(), mapped.cols());
        assert_eq!(r.cols(), rest.cols());
        assert_eq!(r.rows(), mapped.rows() + rest.rows());
        let finished = rest.map(|v| v * 2);
        let full = mapped.vcat(&finished).unwrap();
        assert_eq!(r.map(|v| v * 2), full);
      }
      Progress::Done(_) => panic!("expected an interruption"),
    }
  }
  #[test]
  fn map_until_single_row_cuts_vertically() {
    let r = QuadRope::init(1, 2048, |_, j| j as i64);
    let progress = r.map_until(|| true, |v| v + 1);
    match progress {
      Progress::More { mapped, rest } => {
        assert_eq!(1, mapped.rows());
        assert_eq!(1, rest.rows());
        assert_eq!(r.cols(), mapped.cols() + rest.cols());
        let full = mapped.hcat(&rest.map(|v| v + 1)).unwrap();
        assert_eq!(r.map(|v| v + 1), full);
      }
      Progress::Done(_) => panic!("expected an interruption"),
    }
  }
}
