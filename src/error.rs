/*!
These are all the custom errors that this library could return.

Every fallible operation on a [`QuadRope`](crate::QuadRope) surfaces one of
the variants below; nothing is caught and silently recovered. Operations are
pure functions of their inputs, so a returned error never leaves a rope in a
partial state.
*/

/// Errors produced as a result of interactions with a quad rope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuadRopeError {
  /// Produced when a user attempts to access a cell outside the bounds of
  /// the rectangle a rope represents, or any cell of the empty rope.
  OutOfBounds {
    ///
    i_j: [usize; 2],
    ///
    rows_cols: [usize; 2],
  },
  /// Produced when two shapes disagree: concatenation along a mismatched
  /// edge, zipping ropes of different sizes, or filtering a rope that is
  /// not a single row/column.
  ShapeMismatch {
    /// The operation that rejected its arguments.
    op: &'static str,
    ///
    left: [usize; 2],
    ///
    right: [usize; 2],
  },
  /// Produced when an argument is malformed in a way that no clamping rule
  /// covers, e.g. a flat array whose length is not a multiple of the
  /// requested width.
  InvalidArgument {
    ///
    reason: String,
  },
}
impl std::error::Error for QuadRopeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    None
  }
}
impl std::fmt::Display for QuadRopeError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    use QuadRopeError::*;
    match self {
      OutOfBounds {
        i_j: [i, j],
        rows_cols: [rows, cols],
      } => write!(f, "Attempt to access a cell at ({}, {}) which is not in the range of the {}x{} rectangle the rope represents", i, j, rows, cols),
      ShapeMismatch {
        op,
        left: [lr, lc],
        right: [rr, rc],
      } => write!(f, "Shapes {}x{} and {}x{} disagree in {}", lr, lc, rr, rc, op),
      InvalidArgument { reason } => write!(f, "Invalid argument: {}", reason),
    }
  }
}

#[cfg(test)]
mod api {
  use super::*;
  #[test]
  fn display_out_of_bounds() {
    let e = QuadRopeError::OutOfBounds {
      i_j: [4, 9],
      rows_cols: [3, 7],
    };
    assert_eq!(
      "Attempt to access a cell at (4, 9) which is not in the range of the 3x7 rectangle the rope represents",
      format!("{}", e),
    );
  }
  #[test]
  fn display_shape_mismatch() {
    let e = QuadRopeError::ShapeMismatch {
      op: "hcat",
      left: [2, 3],
      right: [4, 3],
    };
    assert_eq!("Shapes 2x3 and 4x3 disagree in hcat", format!("{}", e));
  }
}
