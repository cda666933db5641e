//! Process Grid - 2D Arrangement of Participating Processes
//!
//! Arranges the P processes of a job into an immutable `height x width`
//! grid, column-major: world rank `r` sits at row `r % height`, column
//! `r / height`. From a process's coordinates the grid derives its ranks in
//! every distribution order (column-major `VC`, row-major `VR`, diagonal
//! `MD`) and the sub-communicators the redistribution primitives use.
//!
//! # Key Features
//! - Shape arithmetic shared by every process ([`GridShape`])
//! - Grid-column, grid-row, world and diagonal communicators
//! - Near-square default factorization
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::sync::Arc;

use gridmat_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::index::lcm;
use crate::process_group::ProcessGroup;

// =============================================================================
// GridShape
// =============================================================================

/// The dimensions of a process grid, independent of any communicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of grid rows (Pr).
    pub height: usize,
    /// Number of grid columns (Pc).
    pub width: usize,
}

impl GridShape {
    /// Creates a shape, rejecting empty grids.
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(Error::grid_topology(format!(
                "grid dimensions must be positive, got {height}x{width}"
            )));
        }
        Ok(Self { height, width })
    }

    /// Factors `size` processes with the given height.
    pub fn with_height(size: usize, height: usize) -> Result<Self> {
        if height == 0 || size % height != 0 {
            return Err(Error::grid_topology(format!(
                "grid height {height} does not divide {size} processes"
            )));
        }
        Self::new(height, size / height)
    }

    /// Factors `size` processes as close to square as possible (height <= width).
    pub fn square(size: usize) -> Result<Self> {
        let height = (1..=size)
            .take_while(|h| h * h <= size)
            .filter(|h| size % h == 0)
            .last()
            .unwrap_or(1);
        Self::with_height(size, height)
    }

    /// Total number of processes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.height * self.width
    }

    /// Returns true if the grid has as many rows as columns.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.height == self.width
    }

    /// (row, col) of a world rank.
    #[must_use]
    pub const fn coords(&self, rank: usize) -> (usize, usize) {
        (rank % self.height, rank / self.height)
    }

    /// World rank of grid position (row, col).
    #[must_use]
    pub const fn rank_of(&self, row: usize, col: usize) -> usize {
        row + col * self.height
    }

    /// Rank in column-major (`VC`) order.
    #[must_use]
    pub const fn vc_rank(&self, row: usize, col: usize) -> usize {
        row + col * self.height
    }

    /// Rank in row-major (`VR`) order.
    #[must_use]
    pub const fn vr_rank(&self, row: usize, col: usize) -> usize {
        col + row * self.width
    }

    /// (row, col) of a column-major rank.
    #[must_use]
    pub const fn from_vc(&self, vc: usize) -> (usize, usize) {
        (vc % self.height, vc / self.height)
    }

    /// (row, col) of a row-major rank.
    #[must_use]
    pub const fn from_vr(&self, vr: usize) -> (usize, usize) {
        (vr / self.width, vr % self.width)
    }

    /// Length of the diagonal path through (0, 0): lcm(height, width).
    #[must_use]
    pub fn diag_length(&self) -> usize {
        lcm(self.height, self.width)
    }

    /// (row, col) of the k-th process on the diagonal path.
    #[must_use]
    pub const fn from_diag(&self, k: usize) -> (usize, usize) {
        (k % self.height, k % self.width)
    }

    /// Position of (row, col) on the diagonal path, if it lies on it.
    #[must_use]
    pub fn diag_index(&self, row: usize, col: usize) -> Option<usize> {
        let len = self.diag_length();
        (row..len)
            .step_by(self.height)
            .find(|k| k % self.width == col)
    }
}

impl core::fmt::Display for GridShape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

// =============================================================================
// Communicator Scope
// =============================================================================

/// Which sub-communicator a collective runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommScope {
    /// Processes sharing this process's grid column (vary the row).
    GridColumn,
    /// Processes sharing this process's grid row (vary the column).
    GridRow,
    /// Every process, in column-major order.
    Grid,
}

impl core::fmt::Display for CommScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::GridColumn => "grid column",
            Self::GridRow => "grid row",
            Self::Grid => "grid",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ProcessGrid
// =============================================================================

/// A process's view of the grid: its coordinates and its communicators.
#[derive(Debug)]
pub struct ProcessGrid {
    shape: GridShape,
    row: usize,
    col: usize,
    world: ProcessGroup,
    col_comm: ProcessGroup,
    row_comm: ProcessGroup,
    diag_comm: ProcessGroup,
}

impl ProcessGrid {
    /// Builds a grid of the given height over every rank of the backend.
    pub fn new(backend: Arc<dyn Backend>, height: usize) -> Result<Self> {
        let shape = GridShape::with_height(backend.world_size(), height)?;
        Self::with_shape(backend, shape)
    }

    /// Builds the most square grid the world size allows.
    pub fn square(backend: Arc<dyn Backend>) -> Result<Self> {
        let shape = GridShape::square(backend.world_size())?;
        Self::with_shape(backend, shape)
    }

    /// Builds a grid of an explicit shape, which must cover the world exactly.
    pub fn with_shape(backend: Arc<dyn Backend>, shape: GridShape) -> Result<Self> {
        if shape.size() != backend.world_size() {
            return Err(Error::grid_topology(format!(
                "a {shape} grid needs {} processes, the world has {}",
                shape.size(),
                backend.world_size()
            )));
        }
        let (row, col) = shape.coords(backend.rank());

        let col_ranks = (0..shape.height).map(|r| shape.rank_of(r, col)).collect();
        let row_ranks = (0..shape.width).map(|c| shape.rank_of(row, c)).collect();
        let diag_ranks = (0..shape.diag_length())
            .map(|k| {
                let (r, c) = shape.from_diag(k);
                shape.rank_of(r, c)
            })
            .collect();

        Ok(Self {
            shape,
            row,
            col,
            col_comm: ProcessGroup::with_ranks(Arc::clone(&backend), col_ranks)?,
            row_comm: ProcessGroup::with_ranks(Arc::clone(&backend), row_ranks)?,
            diag_comm: ProcessGroup::with_ranks(Arc::clone(&backend), diag_ranks)?,
            world: ProcessGroup::new(backend),
        })
    }

    /// Returns the grid shape.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of grid rows.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.shape.height
    }

    /// Number of grid columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.shape.width
    }

    /// Total number of processes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.shape.size()
    }

    /// World rank of this process.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.world.rank()
    }

    /// Grid row of this process.
    #[must_use]
    pub const fn row(&self) -> usize {
        self.row
    }

    /// Grid column of this process.
    #[must_use]
    pub const fn col(&self) -> usize {
        self.col
    }

    /// Column-major rank of this process.
    #[must_use]
    pub const fn vc_rank(&self) -> usize {
        self.shape.vc_rank(self.row, self.col)
    }

    /// Row-major rank of this process.
    #[must_use]
    pub const fn vr_rank(&self) -> usize {
        self.shape.vr_rank(self.row, self.col)
    }

    /// Position of this process on the diagonal path, if any.
    #[must_use]
    pub fn diag_index(&self) -> Option<usize> {
        self.shape.diag_index(self.row, self.col)
    }

    /// Every process of the job.
    #[must_use]
    pub const fn world(&self) -> &ProcessGroup {
        &self.world
    }

    /// Processes in this process's grid column, ordered by row.
    #[must_use]
    pub const fn col_comm(&self) -> &ProcessGroup {
        &self.col_comm
    }

    /// Processes in this process's grid row, ordered by column.
    #[must_use]
    pub const fn row_comm(&self) -> &ProcessGroup {
        &self.row_comm
    }

    /// Processes on the diagonal path, in path order.
    ///
    /// Off-path processes are not members.
    #[must_use]
    pub const fn diag_comm(&self) -> &ProcessGroup {
        &self.diag_comm
    }

    /// Returns the communicator for a scope.
    #[must_use]
    pub const fn comm(&self, scope: CommScope) -> &ProcessGroup {
        match scope {
            CommScope::GridColumn => &self.col_comm,
            CommScope::GridRow => &self.row_comm,
            CommScope::Grid => &self.world,
        }
    }

    /// Returns true if both grids describe the same process arrangement.
    #[must_use]
    pub fn same_topology(&self, other: &Self) -> bool {
        self.shape == other.shape && self.rank() == other.rank()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;

    #[test]
    fn test_shape_factorization() {
        assert_eq!(GridShape::square(4).unwrap(), GridShape { height: 2, width: 2 });
        assert_eq!(GridShape::square(6).unwrap(), GridShape { height: 2, width: 3 });
        assert_eq!(GridShape::square(7).unwrap(), GridShape { height: 1, width: 7 });
        assert!(GridShape::square(9).unwrap().is_square());
        assert!(!GridShape::square(6).unwrap().is_square());
        assert_eq!(GridShape::square(1).unwrap(), GridShape { height: 1, width: 1 });
        assert!(GridShape::with_height(6, 4).is_err());
        assert!(GridShape::with_height(6, 0).is_err());
        assert!(GridShape::new(0, 3).is_err());
    }

    #[test]
    fn test_shape_orders() {
        let shape = GridShape::new(2, 3).unwrap();
        assert_eq!(shape.coords(3), (1, 1));
        assert_eq!(shape.rank_of(1, 2), 5);
        assert_eq!(shape.vc_rank(1, 2), 5);
        assert_eq!(shape.vr_rank(1, 2), 5);
        assert_eq!(shape.vr_rank(0, 2), 2);
        assert_eq!(shape.from_vr(4), (1, 1));
        assert_eq!(shape.from_vc(4), (0, 2));
        for vr in 0..6 {
            let (r, c) = shape.from_vr(vr);
            assert_eq!(shape.vr_rank(r, c), vr);
        }
    }

    #[test]
    fn test_diagonal_path() {
        let shape = GridShape::new(2, 3).unwrap();
        assert_eq!(shape.diag_length(), 6);
        // lcm = size: every process is on the path exactly once.
        let mut seen = vec![false; 6];
        for k in 0..6 {
            let (r, c) = shape.from_diag(k);
            assert_eq!(shape.diag_index(r, c), Some(k));
            seen[shape.rank_of(r, c)] = true;
        }
        assert!(seen.iter().all(|&s| s));

        let square = GridShape::new(2, 2).unwrap();
        assert_eq!(square.diag_length(), 2);
        assert_eq!(square.diag_index(1, 1), Some(1));
        assert_eq!(square.diag_index(0, 1), None);
    }

    #[test]
    fn test_grid_topology_error() {
        let backend: Arc<dyn Backend> = Arc::new(LocalBackend::single());
        assert!(ProcessGrid::new(backend, 2).is_err());
    }

    #[test]
    fn test_grid_communicators() {
        let grids = LocalBackend::run_world(6, |backend| {
            let grid = ProcessGrid::new(backend, 2).unwrap();
            (
                grid.row(),
                grid.col(),
                grid.col_comm().ranks().to_vec(),
                grid.row_comm().ranks().to_vec(),
                grid.diag_index(),
                grid.vr_rank(),
            )
        });

        let (row, col, col_ranks, row_ranks, diag, vr) = &grids[3];
        assert_eq!((*row, *col), (1, 1));
        assert_eq!(col_ranks, &vec![2, 3]);
        assert_eq!(row_ranks, &vec![1, 3, 5]);
        assert_eq!(*diag, Some(1));
        assert_eq!(*vr, 4);
    }

    #[test]
    fn test_square_grid_and_scopes() {
        let results = LocalBackend::run_world(4, |backend| {
            let grid = ProcessGrid::square(backend).unwrap();
            (
                grid.shape(),
                grid.comm(CommScope::GridColumn).size(),
                grid.comm(CommScope::Grid).size(),
                grid.diag_comm().group_rank(),
            )
        });
        for (rank, (shape, col_size, world_size, diag)) in results.into_iter().enumerate() {
            assert_eq!(shape, GridShape { height: 2, width: 2 });
            assert_eq!(col_size, 2);
            assert_eq!(world_size, 4);
            // Ranks 0 and 3 are (0,0) and (1,1).
            assert_eq!(diag.is_some(), rank == 0 || rank == 3);
        }
    }
}
