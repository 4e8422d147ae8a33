#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

/*!
A persistent, immutable two-dimensional sequence, the *quad rope*, that
stores values addressed by (row, column) and supports whole-matrix bulk
operations in time proportional to the work done, not to the size of the
underlying rectangle.

**Note:** ropes never mutate in place. Every operation returns a new rope
that shares structure with its inputs, so keeping old versions around is
free.
*/

/*!
# How it Works:

A rectangle is a tree whose internal nodes describe either horizontal or
vertical adjacency of two rectangular children, whose leaves hold small
dense tiles, and whose *sparse* nodes represent rectangles of a single
repeated value without materializing them.

## A 4x8 rope built from two halves:

```ignore
          hcat
         /    \
     vcat      sparse 4x4 of 0
    /    \
 tile    tile
 2x4     2x4
```

The left half stores eight cells per tile; the right half stores one value
for sixteen cells. Concatenation, slicing and reversal rearrange the tree
without touching tiles; map, zip, reduce and scan walk it with fast paths
across the sparse parts.

## Balancing

Repeated concatenation keeps depth logarithmic through a Fibonacci rule:
a rope of depth `d` must span at least `fib(d + 2)` columns (rows for the
vertical axis) or it is rebuilt by collecting its spine and pairing
neighbors, the way list-of-pieces ropes are balanced.

## Targets

Bulk operations thread a *target*, one scratch rectangle with a moving
write cursor, through their recursion, so the results of neighboring
subtrees land next to each other in one allocation instead of fragmenting
per leaf.
*/

/*!
# Parallelism:

Every bulk operation has a `par_`-prefixed variant that recurses into cat
children on rayon workers and falls back to the sequential code at tile
granularity. Sibling tasks write disjoint windows of the shared target,
so no locking exists anywhere in the crate. Parallel and sequential
variants produce content-equal results.
*/

/*!
# Feature flags:

- `serde`: `Serialize`/`Deserialize` for [`QuadRope`]. Tiles cross the
  wire as row-major cell lists.
*/

pub use error::QuadRopeError;
pub use rope::{num, Cells, Progress, QuadRope, Rows};

/// Library error types.
pub mod error;

/// The quad rope itself and its operations.
pub mod rope;

mod fibonacci;
mod slice;
mod target;
