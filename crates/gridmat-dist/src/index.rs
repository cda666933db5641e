//! Index Mapping - Global/Local/Owner Arithmetic
//!
//! Pure functions relating a global index to the process that owns it and to
//! its position inside that process's local block. Every distribution reduces
//! to the same cyclic rule per dimension: with stride `S` and alignment `a`,
//! index `i` is owned by the process whose rank within the distribution is
//! `(i + a) mod S`, and sits at local offset `i / S`.
//!
//! The functions are deterministic and identical on every process, which is
//! what lets each side of a transfer predict message sizes without talking.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

// =============================================================================
// Modular Arithmetic
// =============================================================================

/// Non-negative remainder of `a` modulo `m`.
///
/// `m` must be positive.
#[must_use]
pub fn floor_mod(a: isize, m: usize) -> usize {
    debug_assert!(m > 0, "modulus must be positive");
    a.rem_euclid(m as isize) as usize
}

/// Greatest common divisor.
#[must_use]
pub fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple.
#[must_use]
pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

// =============================================================================
// Cyclic Mapping
// =============================================================================

/// First global index owned by the process at `rank_in` (its shift).
#[must_use]
pub fn shift(rank_in: usize, align: usize, stride: usize) -> usize {
    floor_mod(rank_in as isize - align as isize, stride)
}

/// Number of indices in `0..n` owned by a process with the given shift.
#[must_use]
pub const fn length(n: usize, shift: usize, stride: usize) -> usize {
    if n > shift {
        (n - shift - 1) / stride + 1
    } else {
        0
    }
}

/// Rank within the distribution that owns global index `i`.
#[must_use]
pub const fn owner(i: usize, align: usize, stride: usize) -> usize {
    (i + align) % stride
}

// =============================================================================
// DimMap
// =============================================================================

/// The index mapping of one matrix dimension, as seen from one process.
///
/// `shift` is `None` when the process holds nothing in this dimension
/// (off the diagonal path, or not the single owner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimMap {
    /// Distance between consecutive owned global indices.
    pub stride: usize,
    /// First owned global index.
    pub shift: Option<usize>,
}

impl DimMap {
    /// A process holding every index (stride 1, shift 0).
    pub const FULL: Self = Self {
        stride: 1,
        shift: Some(0),
    };

    /// Creates a mapping owning `shift, shift + stride, ...`.
    #[must_use]
    pub const fn cyclic(stride: usize, shift: usize) -> Self {
        Self {
            stride,
            shift: Some(shift),
        }
    }

    /// A process that holds nothing in this dimension.
    #[must_use]
    pub const fn absent(stride: usize) -> Self {
        Self { stride, shift: None }
    }

    /// Returns true if this process participates in the dimension at all.
    #[must_use]
    pub const fn participates(&self) -> bool {
        self.shift.is_some()
    }

    /// Number of owned indices in a dimension of global size `n`.
    #[must_use]
    pub fn length(&self, n: usize) -> usize {
        self.shift.map_or(0, |s| length(n, s, self.stride))
    }

    /// Returns true if global index `i` is owned.
    #[must_use]
    pub fn owns(&self, i: usize) -> bool {
        self.shift.is_some_and(|s| i >= s && (i - s) % self.stride == 0)
    }

    /// Local offset of global index `i`, if owned.
    #[must_use]
    pub fn global_to_local(&self, i: usize) -> Option<usize> {
        self.owns(i).then_some(i / self.stride)
    }

    /// Global index of local offset `li`.
    #[must_use]
    pub fn local_to_global(&self, li: usize) -> Option<usize> {
        self.shift.map(|s| s + li * self.stride)
    }

    /// Owned global indices in `0..n`, ascending.
    #[must_use]
    pub fn indices(&self, n: usize) -> Vec<usize> {
        match self.shift {
            Some(s) if s < n => (s..n).step_by(self.stride).collect(),
            _ => Vec::new(),
        }
    }
}

/// Indices of `0..n` owned by both `a` and `b`, as (local in `a`, local in `b`) lists.
///
/// Both lists follow ascending global order.
#[must_use]
pub fn overlap(n: usize, a: &DimMap, b: &DimMap) -> (Vec<usize>, Vec<usize>) {
    a.indices(n)
        .into_iter()
        .filter(|&i| b.owns(i))
        .map(|i| (i / a.stride, i / b.stride))
        .unzip()
}

// =============================================================================
// Tests
// =============================================================================
