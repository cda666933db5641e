//! Data Types - Element Types of Distributed Matrices
//!
//! Every element type is plain old data, so a local block travels over the
//! transport as raw bytes and is rebuilt on the receiving side without
//! per-element encoding. Types that also support arithmetic implement
//! [`Numeric`], which reductions such as sum-scatter require. Integers, reals
//! and complex numbers over `f32`/`f64` are supported.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use bytemuck::{Pod, Zeroable};
use num_complex::Complex;
use num_traits::Num;

use core::fmt::Debug;

// =============================================================================
// DType
// =============================================================================

/// Runtime tag of an element type, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// `f32`.
    F32,
    /// `f64`.
    F64,
    /// `i8`.
    I8,
    /// `i16`.
    I16,
    /// `i32`.
    I32,
    /// `i64`.
    I64,
    /// `u8`.
    U8,
    /// `u32`.
    U32,
    /// `u64`.
    U64,
    /// `Complex<f32>`.
    C32,
    /// `Complex<f64>`.
    C64,
}

impl DType {
    /// Bytes per element.
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 => 2,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::F64 | Self::I64 | Self::U64 | Self::C32 => 8,
            Self::C64 => 16,
        }
    }

    /// True for `f32` and `f64`.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// True for complex types.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::C32 | Self::C64)
    }

    /// True if a sum does not depend on the order of its terms.
    #[must_use]
    pub const fn has_exact_sums(self) -> bool {
        !self.is_float() && !self.is_complex()
    }

    /// Rust spelling of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::C32 => "c32",
            Self::C64 => "c64",
        }
    }
}

impl core::fmt::Display for DType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// An element type a distributed matrix can hold.
///
/// `Pod` is what lets the transport move local blocks as byte buffers.
pub trait Scalar: Copy + Clone + Debug + Default + PartialEq + Send + Sync + Pod + Zeroable + 'static {
    /// Runtime tag of this type.
    const DTYPE: DType;

    /// Returns [`Scalar::DTYPE`].
    #[must_use]
    fn dtype() -> DType {
        Self::DTYPE
    }
}

/// An element type with the arithmetic reductions need.
///
/// Only sums and products are required, so complex types qualify.
pub trait Numeric: Scalar + Num {
    /// Additive identity.
    const ZERO: Self;

    /// Multiplicative identity.
    const ONE: Self;
}

macro_rules! numeric_types {
    ($($ty:ty => $dtype:ident, $zero:expr, $one:expr;)*) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = DType::$dtype;
            }

            impl Numeric for $ty {
                const ZERO: Self = $zero;
                const ONE: Self = $one;
            }
        )*
    };
}

numeric_types! {
    f32 => F32, 0.0, 1.0;
    f64 => F64, 0.0, 1.0;
    i8 => I8, 0, 1;
    i16 => I16, 0, 1;
    i32 => I32, 0, 1;
    i64 => I64, 0, 1;
    u8 => U8, 0, 1;
    u32 => U32, 0, 1;
    u64 => U64, 0, 1;
    Complex<f32> => C32, Complex { re: 0.0, im: 0.0 }, Complex { re: 1.0, im: 0.0 };
    Complex<f64> => C64, Complex { re: 0.0, im: 0.0 }, Complex { re: 1.0, im: 0.0 };
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_size_matches_rust() {
        assert_eq!(core::mem::size_of::<i64>(), i64::DTYPE.size_of());
        assert_eq!(core::mem::size_of::<f32>(), f32::DTYPE.size_of());
        assert_eq!(core::mem::size_of::<u8>(), u8::DTYPE.size_of());
        assert_eq!(core::mem::size_of::<i16>(), i16::DTYPE.size_of());
    }

    #[test]
    fn test_dtype_exact_sums() {
        assert!(DType::I64.has_exact_sums());
        assert!(!DType::F64.has_exact_sums());
        assert!(!DType::C32.has_exact_sums());
    }

    #[test]
    fn test_complex_scalars() {
        assert_eq!(Complex::<f64>::DTYPE, DType::C64);
        assert_eq!(core::mem::size_of::<Complex<f32>>(), DType::C32.size_of());
        assert_eq!(core::mem::size_of::<Complex<f64>>(), DType::C64.size_of());
        assert!(DType::C64.is_complex() && !DType::C64.is_float());

        let z = Complex::new(1.5_f64, -2.0);
        assert_eq!(z * Complex::<f64>::ONE + Complex::<f64>::ZERO, z);
        let bytes: &[u8] = bytemuck::cast_slice(core::slice::from_ref(&z));
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn test_scalar_dtype() {
        assert_eq!(f64::dtype(), DType::F64);
        assert_eq!(u64::dtype().to_string(), "u64");
    }

    #[test]
    fn test_numeric_constants() {
        assert_eq!(f64::ZERO, 0.0);
        assert_eq!(f64::ONE, 1.0);
        assert_eq!(<i32 as Numeric>::ZERO, 0);
        assert_eq!(<u32 as Numeric>::ONE, 1);
    }
}
