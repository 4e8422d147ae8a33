//! End-to-end scenarios exercising construction, numerics, scanning and
//! filtering through the public API only.

use quad_rope::{num, QuadRope, QuadRopeError};

#[test]
fn counting_grid() -> Result<(), QuadRopeError> {
  let r = QuadRope::init(3, 4, |i, j| i * 4 + j);
  assert_eq!(
    vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9, 10, 11]],
    r.to_array_2d(),
  );
  assert_eq!(&11, r.get(2, 3)?);
  Ok(())
}

#[test]
fn sparse_numerics() {
  let r = QuadRope::create(10, 10, 7.0);
  assert_eq!(700.0, num::sum(&r));
  let zero_left = QuadRope::create(2, 3, 0.0)
    .hcat(&QuadRope::create(2, 5, 9.0))
    .unwrap();
  assert_eq!(0.0, num::prod(&zero_left));
}

#[test]
fn symmetric_grid_equals_its_transpose() {
  let a = QuadRope::init(5, 5, |i, j| i + j);
  let b = a.transpose();
  assert_eq!(Ok(true), a.equals(&b));
}

#[test]
fn summed_area_of_ones() {
  let r = QuadRope::init(4, 4, |_, _| 1);
  let s = r.scan(|a, b| a + b, |a, b| a - b, |_, _| 0);
  for i in 0..4 {
    for j in 0..4 {
      assert_eq!(&(((i + 1) * (j + 1)) as i32), s.get(i, j).unwrap());
    }
  }
}

#[test]
fn sparse_dense_concatenation() -> Result<(), QuadRopeError> {
  let r = QuadRope::create(3, 2, 0)
    .hcat(&QuadRope::init(3, 2, |i, j| i + j))?;
  assert_eq!(4, r.cols());
  assert_eq!(&0, r.get(1, 0)?);
  assert_eq!(&2, r.get(1, 3)?);
  Ok(())
}

#[test]
fn even_cells_of_a_row() -> Result<(), QuadRopeError> {
  let r = QuadRope::init(1, 10, |_, j| j);
  let kept = r.hfilter(|v| v % 2 == 0)?;
  assert_eq!(1, kept.rows());
  assert_eq!(5, kept.cols());
  assert_eq!(vec![0, 2, 4, 6, 8], kept.to_flat_array());
  Ok(())
}
