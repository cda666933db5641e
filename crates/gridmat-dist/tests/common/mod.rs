//! Common test utilities for integration tests

#![allow(dead_code)]

use gridmat_dist::prelude::*;
use gridmat_dist::{is_valid_pair, Scalar};
use std::sync::Arc;

/// Runs `f` on every rank of a `size`-process grid of the given height.
pub fn run_grid<R, F>(size: usize, height: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Arc<ProcessGrid>) -> R + Sync,
{
    LocalBackend::run_world(size, |backend| {
        let grid = ProcessGrid::new(backend, height).expect("Failed to build grid");
        f(Arc::new(grid))
    })
}

/// Value stored at global element (i, j) by the tests.
pub fn value(i: usize, j: usize) -> i64 {
    (i * 100 + j) as i64
}

/// Matrix whose element (i, j) is [`value`]`(i, j)`.
pub fn test_matrix(grid: &Arc<ProcessGrid>, m: usize, n: usize, desc: Descriptor) -> DistMatrix<i64> {
    DistMatrix::from_fn(Arc::clone(grid), m, n, desc, value).expect("Failed to create matrix")
}

/// Checks every locally held element against `expected` and the block shape
/// against the index mapping. Returns the number of elements held.
pub fn check_local<T, F>(matrix: &DistMatrix<T>, expected: F) -> usize
where
    T: Scalar,
    F: Fn(usize, usize) -> T,
{
    let grid = matrix.grid();
    let (lh, lw) = matrix.descriptor().local_dims(
        grid.shape(),
        grid.row(),
        grid.col(),
        matrix.height(),
        matrix.width(),
    );
    assert_eq!(
        (matrix.local_height(), matrix.local_width()),
        (lh, lw),
        "local dims of {} on rank {}",
        matrix.descriptor(),
        grid.rank()
    );

    for li in 0..lh {
        for lj in 0..lw {
            let i = matrix.global_row(li).expect("row in range");
            let j = matrix.global_col(lj).expect("col in range");
            assert_eq!(
                matrix.get_local(li, lj).unwrap(),
                expected(i, j),
                "element ({i}, {j}) of {} on rank {}",
                matrix.descriptor(),
                grid.rank()
            );
        }
    }
    lh * lw
}

/// Every valid descriptor, with a non-trivial alignment or root where one applies.
pub fn all_descriptors(shape: GridShape) -> Vec<Descriptor> {
    let mut out = Vec::new();
    for col in Dist::ALL {
        for row in Dist::ALL {
            if !is_valid_pair(col, row) {
                continue;
            }
            let base = Descriptor::new(col, row).unwrap();
            if col == Dist::Circ {
                out.push(base.with_root(shape.size() - 1));
            } else {
                out.push(base);
                let aligned = base.aligned(1, 1).normalize(shape).unwrap();
                if aligned != base {
                    out.push(aligned);
                }
            }
        }
    }
    out
}
