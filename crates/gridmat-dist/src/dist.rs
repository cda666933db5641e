//! Distribution Descriptors - How a Matrix Is Laid Over the Grid
//!
//! A [`Descriptor`] pairs a column distribution (how the matrix's rows are
//! spread) with a row distribution (how its columns are spread), plus an
//! alignment per dimension and a root for single-owner layouts. Only a closed
//! set of pairs is valid; anything else is rejected with
//! `InvalidDistribution`.
//!
//! # Key Features
//! - The seven per-dimension distributions (`MC`, `MR`, `VC`, `VR`, `MD`, `*`, `o`)
//! - Validation of the fourteen legal pairs
//! - Normalization of alignments against a grid shape
//! - Per-process index maps for any descriptor
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use gridmat_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::grid::GridShape;
use crate::index::{shift, DimMap};

// =============================================================================
// Dist
// =============================================================================

/// Distribution of one matrix dimension over the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dist {
    /// Cyclic over the grid rows (stride Pr).
    #[serde(rename = "MC")]
    Mc,
    /// Cyclic over the grid columns (stride Pc).
    #[serde(rename = "MR")]
    Mr,
    /// Cyclic over all processes in column-major order (stride P).
    #[serde(rename = "VC")]
    Vc,
    /// Cyclic over all processes in row-major order (stride P).
    #[serde(rename = "VR")]
    Vr,
    /// Cyclic over the diagonal path through (0, 0) (stride lcm(Pr, Pc)).
    #[serde(rename = "MD")]
    Md,
    /// Replicated on every process.
    #[serde(rename = "*")]
    Star,
    /// Held entirely by a single root process.
    #[serde(rename = "o")]
    Circ,
}

/// Family a per-dimension distribution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// `MC` or `MR`.
    Cyclic,
    /// `VC` or `VR`.
    LinearCyclic,
    /// `*`.
    Replicated,
    /// `o`.
    SingleOwner,
    /// `MD`.
    Diagonal,
}

impl Dist {
    /// Every distribution, linear-cyclic first.
    pub const ALL: [Dist; 7] = [
        Dist::Vc,
        Dist::Vr,
        Dist::Mc,
        Dist::Mr,
        Dist::Md,
        Dist::Star,
        Dist::Circ,
    ];

    /// Short name as used in `[MC,MR]` notation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Dist::Mc => "MC",
            Dist::Mr => "MR",
            Dist::Vc => "VC",
            Dist::Vr => "VR",
            Dist::Md => "MD",
            Dist::Star => "*",
            Dist::Circ => "o",
        }
    }

    /// Returns the scheme family.
    #[must_use]
    pub const fn scheme(self) -> Scheme {
        match self {
            Dist::Mc | Dist::Mr => Scheme::Cyclic,
            Dist::Vc | Dist::Vr => Scheme::LinearCyclic,
            Dist::Md => Scheme::Diagonal,
            Dist::Star => Scheme::Replicated,
            Dist::Circ => Scheme::SingleOwner,
        }
    }

    /// Number of distinct owners along this dimension on a grid.
    #[must_use]
    pub fn stride(self, shape: GridShape) -> usize {
        match self {
            Dist::Mc => shape.height,
            Dist::Mr => shape.width,
            Dist::Vc | Dist::Vr => shape.size(),
            Dist::Md => shape.diag_length(),
            Dist::Star | Dist::Circ => 1,
        }
    }

    /// True if the owner of an index depends on the grid row.
    #[must_use]
    pub const fn uses_rows(self) -> bool {
        matches!(self, Dist::Mc | Dist::Vc | Dist::Vr | Dist::Md | Dist::Circ)
    }

    /// True if the owner of an index depends on the grid column.
    #[must_use]
    pub const fn uses_cols(self) -> bool {
        matches!(self, Dist::Mr | Dist::Vc | Dist::Vr | Dist::Md | Dist::Circ)
    }

    /// Rank of grid position (row, col) within this distribution.
    ///
    /// `None` for `MD` off the diagonal path; `*` and `o` have no ranking and
    /// report 0.
    #[must_use]
    pub fn rank_in(self, shape: GridShape, row: usize, col: usize) -> Option<usize> {
        match self {
            Dist::Mc => Some(row),
            Dist::Mr => Some(col),
            Dist::Vc => Some(shape.vc_rank(row, col)),
            Dist::Vr => Some(shape.vr_rank(row, col)),
            Dist::Md => shape.diag_index(row, col),
            Dist::Star | Dist::Circ => Some(0),
        }
    }

    /// Grid coordinates fixed by holding distribution rank `k`.
    ///
    /// Returns (row, col) with `None` for coordinates the distribution leaves free.
    #[must_use]
    pub const fn position_of(self, shape: GridShape, k: usize) -> (Option<usize>, Option<usize>) {
        match self {
            Dist::Mc => (Some(k), None),
            Dist::Mr => (None, Some(k)),
            Dist::Vc => {
                let (r, c) = shape.from_vc(k);
                (Some(r), Some(c))
            }
            Dist::Vr => {
                let (r, c) = shape.from_vr(k);
                (Some(r), Some(c))
            }
            Dist::Md => {
                let (r, c) = shape.from_diag(k);
                (Some(r), Some(c))
            }
            Dist::Star | Dist::Circ => (None, None),
        }
    }
}

impl core::fmt::Display for Dist {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Category
// =============================================================================

/// Coarse classification of a descriptor, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// `[MC,MR]` or `[MR,MC]`.
    Cyclic,
    /// One cyclic dimension, the other replicated.
    Partial,
    /// One linear-cyclic dimension, the other replicated.
    Vector,
    /// One diagonal dimension, the other replicated.
    Diagonal,
    /// `[*,*]`.
    Replicated,
    /// `[o,o]`.
    SingleOwner,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Full layout of a matrix: both dimensions' distributions, alignments and root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    /// Distribution of the rows (the column dimension).
    pub col_dist: Dist,
    /// Distribution of the columns (the row dimension).
    pub row_dist: Dist,
    /// Alignment of the column distribution.
    #[serde(default)]
    pub col_align: usize,
    /// Alignment of the row distribution.
    #[serde(default)]
    pub row_align: usize,
    /// Owner of a single-owner layout.
    #[serde(default)]
    pub root: usize,
}

/// Returns true if `[col,row]` is a supported pair.
#[must_use]
pub const fn is_valid_pair(col: Dist, row: Dist) -> bool {
    use Dist::{Circ, Mc, Md, Mr, Star, Vc, Vr};
    matches!(
        (col, row),
        (Mc, Mr)
            | (Mr, Mc)
            | (Mc, Star)
            | (Star, Mr)
            | (Mr, Star)
            | (Star, Mc)
            | (Vc, Star)
            | (Star, Vc)
            | (Vr, Star)
            | (Star, Vr)
            | (Md, Star)
            | (Star, Md)
            | (Star, Star)
            | (Circ, Circ)
    )
}

impl Descriptor {
    /// Creates a zero-aligned descriptor, validating the pair.
    pub fn new(col_dist: Dist, row_dist: Dist) -> Result<Self> {
        if !is_valid_pair(col_dist, row_dist) {
            return Err(Error::InvalidDistribution {
                col: col_dist.name().to_string(),
                row: row_dist.name().to_string(),
            });
        }
        Ok(Self {
            col_dist,
            row_dist,
            col_align: 0,
            row_align: 0,
            root: 0,
        })
    }

    /// `[MC,MR]`, the default element-cyclic layout.
    #[must_use]
    pub const fn cyclic() -> Self {
        Self::pair(Dist::Mc, Dist::Mr)
    }

    /// `[*,*]`, every process holds everything.
    #[must_use]
    pub const fn replicated() -> Self {
        Self::pair(Dist::Star, Dist::Star)
    }

    /// `[o,o]` owned by `root`.
    #[must_use]
    pub const fn single_owner(root: usize) -> Self {
        let mut desc = Self::pair(Dist::Circ, Dist::Circ);
        desc.root = root;
        desc
    }

    const fn pair(col_dist: Dist, row_dist: Dist) -> Self {
        Self {
            col_dist,
            row_dist,
            col_align: 0,
            row_align: 0,
            root: 0,
        }
    }

    /// Returns a copy with the given alignments.
    #[must_use]
    pub const fn aligned(mut self, col_align: usize, row_align: usize) -> Self {
        self.col_align = col_align;
        self.row_align = row_align;
        self
    }

    /// Returns a copy with the given root.
    #[must_use]
    pub const fn with_root(mut self, root: usize) -> Self {
        self.root = root;
        self
    }

    /// Validates the pair and reduces alignments modulo their strides.
    ///
    /// Replicated and single-owner dimensions carry alignment 0; the root is
    /// only meaningful (and checked) for single-owner layouts.
    pub fn normalize(&self, shape: GridShape) -> Result<Self> {
        let valid = Self::new(self.col_dist, self.row_dist)?;
        let is_circ = self.col_dist == Dist::Circ;
        if is_circ && self.root >= shape.size() {
            return Err(Error::grid_topology(format!(
                "root {} is outside a {shape} grid",
                self.root
            )));
        }

        let reduce = |dist: Dist, align: usize| match dist {
            Dist::Star | Dist::Circ => 0,
            _ => align % dist.stride(shape),
        };
        Ok(Self {
            col_align: reduce(self.col_dist, self.col_align),
            row_align: reduce(self.row_dist, self.row_align),
            root: if is_circ { self.root } else { 0 },
            ..valid
        })
    }

    /// Returns the coarse category.
    #[must_use]
    pub const fn category(&self) -> Category {
        match (self.col_dist, self.row_dist) {
            (Dist::Mc, Dist::Mr) | (Dist::Mr, Dist::Mc) => Category::Cyclic,
            (Dist::Star, Dist::Star) => Category::Replicated,
            (Dist::Circ, _) | (_, Dist::Circ) => Category::SingleOwner,
            (Dist::Vc | Dist::Vr, _) | (_, Dist::Vc | Dist::Vr) => Category::Vector,
            (Dist::Md, _) | (_, Dist::Md) => Category::Diagonal,
            _ => Category::Partial,
        }
    }

    /// True for `[o,o]`.
    #[must_use]
    pub const fn is_single_owner(&self) -> bool {
        matches!(self.col_dist, Dist::Circ)
    }

    /// True for `[*,*]`.
    #[must_use]
    pub const fn is_replicated(&self) -> bool {
        matches!((self.col_dist, self.row_dist), (Dist::Star, Dist::Star))
    }

    /// True if the rows' owners depend on the grid row.
    #[must_use]
    pub const fn uses_rows(&self) -> bool {
        self.col_dist.uses_rows() || self.row_dist.uses_rows()
    }

    /// True if the owners depend on the grid column.
    #[must_use]
    pub const fn uses_cols(&self) -> bool {
        self.col_dist.uses_cols() || self.row_dist.uses_cols()
    }

    /// True if some element is held by more than one process.
    #[must_use]
    pub const fn is_redundant(&self) -> bool {
        !(self.uses_rows() && self.uses_cols())
    }

    /// Index maps of both dimensions for the process at (row, col).
    ///
    /// Processes off the diagonal path of an `MD` layout, and every process
    /// but the root of an `[o,o]` layout, hold a 0x0 block.
    #[must_use]
    pub fn dim_maps(&self, shape: GridShape, row: usize, col: usize) -> (DimMap, DimMap) {
        if self.is_single_owner() {
            return if shape.rank_of(row, col) == self.root {
                (DimMap::FULL, DimMap::FULL)
            } else {
                (DimMap::absent(1), DimMap::absent(1))
            };
        }

        let map = |dist: Dist, align: usize| {
            let stride = dist.stride(shape);
            match dist {
                Dist::Star => Some(DimMap::FULL),
                _ => dist
                    .rank_in(shape, row, col)
                    .map(|k| DimMap::cyclic(stride, shift(k, align, stride))),
            }
        };
        match (map(self.col_dist, self.col_align), map(self.row_dist, self.row_align)) {
            (Some(c), Some(r)) => (c, r),
            _ => (
                DimMap::absent(self.col_dist.stride(shape)),
                DimMap::absent(self.row_dist.stride(shape)),
            ),
        }
    }

    /// Index maps of both dimensions for a world rank.
    #[must_use]
    pub fn dim_maps_of(&self, shape: GridShape, rank: usize) -> (DimMap, DimMap) {
        let (row, col) = shape.coords(rank);
        self.dim_maps(shape, row, col)
    }

    /// Local block dimensions of the process at (row, col) for an `m x n` matrix.
    #[must_use]
    pub fn local_dims(&self, shape: GridShape, row: usize, col: usize, m: usize, n: usize) -> (usize, usize) {
        let (c, r) = self.dim_maps(shape, row, col);
        (c.length(m), r.length(n))
    }

    /// World ranks holding element (i, j).
    #[must_use]
    pub fn owners(&self, shape: GridShape, i: usize, j: usize) -> Vec<usize> {
        (0..shape.size())
            .filter(|&rank| {
                let (c, r) = self.dim_maps_of(shape, rank);
                c.owns(i) && r.owns(j)
            })
            .collect()
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::cyclic()
    }
}

impl core::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{},{}]", self.col_dist, self.row_dist)?;
        if self.is_single_owner() {
            if self.root != 0 {
                write!(f, "@{}", self.root)?;
            }
        } else if self.col_align != 0 || self.row_align != 0 {
            write!(f, "({},{})", self.col_align, self.row_align)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(h: usize, w: usize) -> GridShape {
        GridShape::new(h, w).unwrap()
    }

    #[test]
    fn test_valid_pairs() {
        let mut count = 0;
        for col in Dist::ALL {
            for row in Dist::ALL {
                if is_valid_pair(col, row) {
                    count += 1;
                    assert!(Descriptor::new(col, row).is_ok());
                } else {
                    assert_eq!(
                        Descriptor::new(col, row).unwrap_err(),
                        Error::InvalidDistribution {
                            col: col.name().to_string(),
                            row: row.name().to_string(),
                        }
                    );
                }
            }
        }
        assert_eq!(count, 14);
    }

    #[test]
    fn test_normalize_reduces_alignment() {
        let s = shape(2, 3);
        let desc = Descriptor::cyclic().aligned(5, 7).normalize(s).unwrap();
        assert_eq!((desc.col_align, desc.row_align), (1, 1));

        let star = Descriptor::new(Dist::Vc, Dist::Star)
            .unwrap()
            .aligned(13, 4)
            .normalize(s)
            .unwrap();
        assert_eq!((star.col_align, star.row_align), (1, 0));

        let circ = Descriptor::single_owner(5).aligned(1, 1).normalize(s).unwrap();
        assert_eq!((circ.col_align, circ.row_align, circ.root), (0, 0, 5));
        assert!(Descriptor::single_owner(6).normalize(s).is_err());

        let bad = Descriptor {
            col_dist: Dist::Mc,
            row_dist: Dist::Mc,
            col_align: 0,
            row_align: 0,
            root: 0,
        };
        assert!(bad.normalize(s).is_err());
    }

    #[test]
    fn test_categories_and_redundancy() {
        let d = |c, r| Descriptor::new(c, r).unwrap();
        assert_eq!(d(Dist::Mr, Dist::Mc).category(), Category::Cyclic);
        assert_eq!(d(Dist::Mc, Dist::Star).category(), Category::Partial);
        assert_eq!(d(Dist::Star, Dist::Vr).category(), Category::Vector);
        assert_eq!(d(Dist::Md, Dist::Star).category(), Category::Diagonal);
        assert_eq!(Descriptor::replicated().category(), Category::Replicated);
        assert_eq!(Descriptor::single_owner(0).category(), Category::SingleOwner);
        assert_eq!(Dist::Vr.scheme(), Scheme::LinearCyclic);

        assert!(!Descriptor::cyclic().is_redundant());
        assert!(!d(Dist::Vc, Dist::Star).is_redundant());
        assert!(!d(Dist::Md, Dist::Star).is_redundant());
        assert!(!Descriptor::single_owner(0).is_redundant());
        assert!(d(Dist::Mc, Dist::Star).is_redundant());
        assert!(d(Dist::Star, Dist::Mr).is_redundant());
        assert!(Descriptor::replicated().is_redundant());
    }

    #[test]
    fn test_dim_maps_cyclic() {
        let s = shape(2, 3);
        // Process (1, 2) with alignments (1, 1).
        let desc = Descriptor::cyclic().aligned(1, 1);
        let (c, r) = desc.dim_maps(s, 1, 2);
        assert_eq!(c, DimMap::cyclic(2, 0));
        assert_eq!(r, DimMap::cyclic(3, 1));
        assert_eq!(desc.local_dims(s, 1, 2, 5, 7), (3, 2));
    }

    #[test]
    fn test_dim_maps_diagonal_and_root() {
        let s = shape(2, 2);
        let md = Descriptor::new(Dist::Md, Dist::Star).unwrap();
        assert_eq!(md.local_dims(s, 1, 1, 5, 3), (2, 3));
        assert_eq!(md.local_dims(s, 0, 1, 5, 3), (0, 0));

        let circ = Descriptor::single_owner(2);
        assert_eq!(circ.local_dims(s, 0, 1, 5, 3), (5, 3));
        assert_eq!(circ.local_dims(s, 0, 0, 5, 3), (0, 0));
    }

    #[test]
    fn test_owners_partition() {
        let s = shape(2, 3);
        for (col, row) in [(Dist::Mc, Dist::Mr), (Dist::Vr, Dist::Star), (Dist::Star, Dist::Md)] {
            let desc = Descriptor::new(col, row).unwrap().aligned(1, 2).normalize(s).unwrap();
            for i in 0..7 {
                for j in 0..5 {
                    assert_eq!(desc.owners(s, i, j).len(), 1, "{desc} ({i},{j})");
                }
            }
        }
        assert_eq!(Descriptor::replicated().owners(s, 0, 0).len(), 6);
        assert_eq!(Descriptor::new(Dist::Mc, Dist::Star).unwrap().owners(s, 3, 4), vec![1, 3, 5]);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(Descriptor::cyclic().to_string(), "[MC,MR]");
        assert_eq!(Descriptor::cyclic().aligned(1, 0).to_string(), "[MC,MR](1,0)");
        assert_eq!(Descriptor::single_owner(3).to_string(), "[o,o]@3");

        let json = r#"{"col_dist":"VC","row_dist":"*","col_align":2}"#;
        let desc: Descriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc, Descriptor::new(Dist::Vc, Dist::Star).unwrap().aligned(2, 0));
        let back = serde_json::to_string(&desc).unwrap();
        assert!(back.contains(r#""col_dist":"VC""#));
    }
}
