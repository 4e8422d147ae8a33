/*!
Sparse-aware numerical operations over ropes of doubles.

Zero and one rectangles are algebraically special: sums skip them in O(1),
products annihilate on zero without touching siblings, and pointwise
multiplication returns zero blocks and elides one blocks without visiting
their cells.
*/

use std::sync::Arc;

use crate::error::QuadRopeError as Error;
use crate::rope::{
  empty_node, get_node, hnode, leaf, materialize_node, slice_node, sparse_node, vnode, Node,
  QuadRope, MAX_TILE_EDGE,
};
use crate::slice::ArraySlice;

type Result<T> = std::result::Result<T, Error>;

/// The sum of all cells. A sparse `h x w` rectangle contributes
/// `value * h * w` in constant time.
/// ```
/// use quad_rope::{num, QuadRope};
/// let r = QuadRope::create(10, 10, 7.0);
/// assert_eq!(700.0, num::sum(&r));
/// ```
pub fn sum(r: &QuadRope<f64>) -> f64 {
  sum_node(r.node())
}
fn sum_node(node: &Arc<Node<f64>>) -> f64 {
  match &**node {
    Node::Empty => 0.0,
    Node::Leaf(s) => s.fold(0.0, |acc, v| acc + v),
    Node::Sparse { rows, cols, value } => value * (rows * cols) as f64,
    Node::HCat { left, right, .. } => sum_node(left) + sum_node(right),
    Node::VCat { top, bottom, .. } => sum_node(top) + sum_node(bottom),
    Node::Slice { .. } => sum_node(&materialize_node(node)),
  }
}

/// The product of all cells. A zero rectangle annihilates the whole
/// product without evaluating siblings; a one rectangle contributes
/// nothing.
pub fn prod(r: &QuadRope<f64>) -> f64 {
  prod_node(r.node())
}
fn prod_node(node: &Arc<Node<f64>>) -> f64 {
  match &**node {
    Node::Empty => 1.0,
    Node::Leaf(s) => s.fold(1.0, |acc, v| acc * v),
    Node::Sparse { value, .. } if *value == 0.0 => 0.0,
    Node::Sparse { value, .. } if *value == 1.0 => 1.0,
    Node::Sparse { rows, cols, value } => value.powi((rows * cols) as i32),
    Node::HCat { left, right, .. } => {
      let p = prod_node(left);
      if p == 0.0 {
        0.0
      } else {
        p * prod_node(right)
      }
    }
    Node::VCat { top, bottom, .. } => {
      let p = prod_node(top);
      if p == 0.0 {
        0.0
      } else {
        p * prod_node(bottom)
      }
    }
    Node::Slice { .. } => prod_node(&materialize_node(node)),
  }
}

/// The `n x n` identity matrix. Off-diagonal quadrants are zero
/// rectangles, so the representation is O(n) tiles rather than O(n^2)
/// cells.
/// ```
/// use quad_rope::{num, QuadRope};
/// let id = num::identity(100);
/// assert_eq!(100.0, num::sum(&id));
/// assert_eq!(Ok(&1.0), id.get(42, 42));
/// assert_eq!(Ok(&0.0), id.get(42, 43));
/// ```
pub fn identity(n: usize) -> QuadRope<f64> {
  QuadRope::from_node(identity_node(n))
}
fn identity_node(n: usize) -> Arc<Node<f64>> {
  if n == 0 {
    return empty_node();
  }
  if n <= MAX_TILE_EDGE {
    return leaf(ArraySlice::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 }));
  }
  let half = n / 2;
  let rest = n - half;
  let top = hnode(identity_node(half), sparse_node(half, rest, 0.0));
  let bottom = hnode(sparse_node(rest, half, 0.0), identity_node(rest));
  vnode(top, bottom)
}

/// The `n x n` matrix whose strictly upper triangle is `v` and whose
/// remaining cells are zero. The lower triangle is a handful of zero
/// rectangles.
pub fn upper_diagonal(n: usize, v: f64) -> QuadRope<f64> {
  QuadRope::from_node(upper_node(n, v))
}
fn upper_node(n: usize, v: f64) -> Arc<Node<f64>> {
  if n == 0 {
    return empty_node();
  }
  if n <= MAX_TILE_EDGE {
    return leaf(ArraySlice::from_fn(n, n, |i, j| if j > i { v } else { 0.0 }));
  }
  let half = n / 2;
  let rest = n - half;
  let top = hnode(upper_node(half, v), sparse_node(half, rest, v));
  let bottom = hnode(sparse_node(rest, half, 0.0), upper_node(rest, v));
  vnode(top, bottom)
}

/// The `n x n` matrix whose strictly lower triangle is `v` and whose
/// remaining cells are zero.
pub fn lower_diagonal(n: usize, v: f64) -> QuadRope<f64> {
  QuadRope::from_node(lower_node(n, v))
}
fn lower_node(n: usize, v: f64) -> Arc<Node<f64>> {
  if n == 0 {
    return empty_node();
  }
  if n <= MAX_TILE_EDGE {
    return leaf(ArraySlice::from_fn(n, n, |i, j| if j < i { v } else { 0.0 }));
  }
  let half = n / 2;
  let rest = n - half;
  let top = hnode(lower_node(half, v), sparse_node(half, rest, 0.0));
  let bottom = hnode(sparse_node(rest, half, v), lower_node(rest, v));
  vnode(top, bottom)
}

/// Cell-wise multiplication. Zero rectangles are returned as-is without
/// visiting the other side; one rectangles yield the other side
/// unchanged. When structures disagree, the shallower rope is split along
/// the deeper one.
/// ```
/// fn main() -> Result<(), quad_rope::QuadRopeError> {
///   use quad_rope::{num, QuadRope};
///   let a = num::identity(8);
///   let b = QuadRope::create(8, 8, 5.0);
///   let d = num::pointwise(&a, &b)?;
///   assert_eq!(40.0, num::sum(&d));
///   Ok(())
/// }
/// ```
pub fn pointwise(a: &QuadRope<f64>, b: &QuadRope<f64>) -> Result<QuadRope<f64>> {
  if a.rows() != b.rows() || a.cols() != b.cols() {
    return Err(Error::ShapeMismatch {
      op: "pointwise",
      left: [a.rows(), a.cols()],
      right: [b.rows(), b.cols()],
    });
  }
  Ok(QuadRope::from_node(pointwise_node(a.node(), b.node())))
}
fn pointwise_node(a: &Arc<Node<f64>>, b: &Arc<Node<f64>>) -> Arc<Node<f64>> {
  debug_assert!(a.rows() == b.rows() && a.cols() == b.cols());
  match (&**a, &**b) {
    (Node::Empty, _) | (_, Node::Empty) => empty_node(),
    (Node::Sparse { value, .. }, _) if *value == 0.0 => Arc::clone(a),
    (_, Node::Sparse { value, .. }) if *value == 0.0 => Arc::clone(b),
    (Node::Sparse { value, .. }, _) if *value == 1.0 => Arc::clone(b),
    (_, Node::Sparse { value, .. }) if *value == 1.0 => Arc::clone(a),
    (
      Node::Sparse {
        rows, cols, value: v1,
      },
      Node::Sparse { value: v2, .. },
    ) => sparse_node(*rows, *cols, v1 * v2),
    (
      Node::HCat {
        left: a1, right: a2, ..
      },
      Node::HCat {
        left: b1, right: b2, ..
      },
    ) if a1.cols() == b1.cols() => hnode(pointwise_node(a1, b1), pointwise_node(a2, b2)),
    (
      Node::VCat {
        top: a1, bottom: a2, ..
      },
      Node::VCat {
        top: b1, bottom: b2, ..
      },
    ) if a1.rows() == b1.rows() => vnode(pointwise_node(a1, b1), pointwise_node(a2, b2)),
    (Node::Slice { .. }, _) => pointwise_node(&materialize_node(a), b),
    (_, Node::Slice { .. }) => pointwise_node(a, &materialize_node(b)),
    _ => {
      if a.depth() < b.depth() {
        return pointwise_node(b, a);
      }
      match &**a {
        Node::HCat { left, right, .. } => {
          let lw = left.cols();
          let b1 = slice_node(0, 0, b.rows(), lw, b);
          let b2 = slice_node(0, lw, b.rows(), b.cols() - lw, b);
          hnode(pointwise_node(left, &b1), pointwise_node(right, &b2))
        }
        Node::VCat { top, bottom, .. } => {
          let th = top.rows();
          let b1 = slice_node(0, 0, th, b.cols(), b);
          let b2 = slice_node(th, 0, b.rows() - th, b.cols(), b);
          vnode(pointwise_node(top, &b1), pointwise_node(bottom, &b2))
        }
        _ => leaf(ArraySlice::from_fn(a.rows(), a.cols(), |i, j| {
          get_node(a, i, j) * get_node(b, i, j)
        })),
      }
    }
  }
}

/* Tests */
#[cfg(test)]
mod api {
  use super::*;
  #[test]
  fn sum_sparse() {
    let r = QuadRope::create(10, 10, 7.0);
    assert_eq!(700.0, sum(&r));
  }
  #[test]
  fn sum_mixed() {
    let r = QuadRope::init(3, 3, |i, j| (i * 3 + j) as f64)
      .hcat(&QuadRope::create(3, 3, 1.0))
      .unwrap();
    assert_eq!(45.0, sum(&r));
  }
  #[test]
  fn prod_zero_block_short_circuits() {
    // A NaN sibling would poison the product if it were evaluated.
    let zero = QuadRope::create(2, 3, 0.0);
    let poison = QuadRope::create(2, 5, f64::NAN);
    let r = zero.hcat(&poison).unwrap();
    assert_eq!(0.0, prod(&r));
  }
  #[test]
  fn prod_one_block_is_neutral() {
    let r = QuadRope::create(4, 4, 1.0)
      .vcat(&QuadRope::init(1, 4, |_, j| (j + 2) as f64))
      .unwrap();
    assert_eq!(120.0, prod(&r));
  }
  #[test]
  fn prod_sparse_power() {
    let r = QuadRope::create(2, 3, 2.0);
    assert_eq!(64.0, prod(&r));
  }
  #[test]
  fn identity_diagonal() {
    let id = identity(40);
    assert_eq!(40, id.rows());
    assert_eq!(40, id.cols());
    assert!(id.is_sparse());
    for i in 0..40 {
      for j in 0..40 {
        let expect = if i == j { 1.0 } else { 0.0 };
        assert_eq!(&expect, id.get(i, j).unwrap());
      }
    }
  }
  #[test]
  fn triangles_tile_the_square() {
    let n = 12;
    let total = lower_diagonal(n, 1.0)
      .zip(&identity(n), |a, b| a + b)
      .unwrap()
      .zip(&upper_diagonal(n, 1.0), |a, b| a + b)
      .unwrap();
    assert!(total.forall(|v| *v == 1.0));
  }
  #[test]
  fn upper_diagonal_counts() {
    let r = upper_diagonal(6, 2.0);
    assert_eq!(30.0, sum(&r));
    assert_eq!(Ok(&2.0), r.get(0, 5));
    assert_eq!(Ok(&0.0), r.get(3, 3));
    assert_eq!(Ok(&0.0), r.get(5, 0));
  }
  #[test]
  fn lower_diagonal_counts() {
    let r = lower_diagonal(6, 2.0);
    assert_eq!(30.0, sum(&r));
    assert_eq!(Ok(&2.0), r.get(5, 0));
    assert_eq!(Ok(&0.0), r.get(0, 5));
  }
  #[test]
  fn pointwise_zero_annihilates_structurally() {
    let zero = QuadRope::create(8, 8, 0.0);
    let dense = QuadRope::init(8, 8, |i, j| (i * 8 + j) as f64);
    let d = pointwise(&zero, &dense).unwrap();
    assert_eq!(0, d.depth());
    assert!(d.is_sparse());
    assert_eq!(0.0, sum(&d));
  }
  #[test]
  fn pointwise_one_elides() {
    let one = QuadRope::create(5, 5, 1.0);
    let dense = QuadRope::init(5, 5, |i, j| (i + j) as f64);
    let d = pointwise(&one, &dense).unwrap();
    assert_eq!(sum(&dense), sum(&d));
  }
  #[test]
  fn pointwise_mismatched_structure() {
    let a = identity(10);
    let b = QuadRope::init(10, 10, |i, j| (i * 10 + j) as f64);
    let d = pointwise(&a, &b).unwrap();
    for i in 0..10 {
      let expect = (i * 10 + i) as f64;
      assert_eq!(&expect, d.get(i, i).unwrap());
    }
    assert_eq!(sum(&d), (0..10).map(|i| (i * 10 + i) as f64).sum::<f64>());
  }
  #[test]
  fn pointwise_shape_mismatch() {
    let a = QuadRope::create(2, 2, 1.0);
    let b = QuadRope::create(2, 3, 1.0);
    assert!(pointwise(&a, &b).is_err());
  }
}
