//! In-memory array buffer and its element/shape/order vocabulary.
//!
//! [`ArrayData`] owns the raw memory image of a 2D or 3D numeric array
//! together with enough metadata to describe it on the wire: element type,
//! per-axis extents, and byte order. Construction is length-checked, so a
//! value that exists is always internally consistent.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// ElementType
// ============================================================================

/// Element type of an array.
///
/// The wire format knows only signed integers and floats, identified by a
/// signed bit-depth code (`bitpix`): positive for integers, negative for
/// floats. Types outside that set carry an explicit conversion policy:
///
/// - `Bool` is promoted to an 8-bit signed integer before encoding.
/// - Unsigned integers reuse the signed code of the same width. Values with
///   the top bit set reinterpret under two's complement; this is intentional
///   and wire-compatible with the peer's fixed type system.
/// - `Float16` is decode-only: the peer may report it, but encoding it is an
///   [`Error::UnsupportedType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// Boolean, stored one byte per element.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer (encoded as `Int8`).
    UInt8,
    /// Unsigned 16-bit integer (encoded as `Int16`).
    UInt16,
    /// Unsigned 32-bit integer (encoded as `Int32`).
    UInt32,
    /// Unsigned 64-bit integer (encoded as `Int64`).
    UInt64,
    /// 16-bit float. Decode-only; never produced by encoding.
    Float16,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
}

impl ElementType {
    /// Returns the width of one element in bytes.
    #[must_use]
    pub fn size_of(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns the wire bit-depth code for this type.
    ///
    /// Integer types map to `+bits`, floats to `-bits`. `Bool` is promoted
    /// to the 8-bit signed code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for [`ElementType::Float16`],
    /// which has no encode path.
    pub fn bitpix(&self) -> Result<i32> {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => Ok(8),
            Self::Int16 | Self::UInt16 => Ok(16),
            Self::Int32 | Self::UInt32 => Ok(32),
            Self::Int64 | Self::UInt64 => Ok(64),
            Self::Float32 => Ok(-32),
            Self::Float64 => Ok(-64),
            Self::Float16 => Err(Error::unsupported_type(self.name())),
        }
    }

    /// Maps a wire bit-depth code back to an element type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormat`] for any code outside
    /// `{-64, -32, -16, 64, 32, 16, 8}`.
    pub fn from_bitpix(code: i32) -> Result<Self> {
        match code {
            -64 => Ok(Self::Float64),
            -32 => Ok(Self::Float32),
            -16 => Ok(Self::Float16),
            64 => Ok(Self::Int64),
            32 => Ok(Self::Int32),
            16 => Ok(Self::Int16),
            8 => Ok(Self::Int8),
            _ => Err(Error::unknown_format(code)),
        }
    }

    /// Returns the canonical name of this type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float16 => "f16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ByteOrder
// ============================================================================

/// Byte order of the raw array bytes.
///
/// Only an explicit non-native order is reported on the wire; native order
/// omits the `arch` field entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Host byte order (no `arch` token emitted).
    #[default]
    Native,
    /// Little-endian.
    Little,
    /// Big-endian.
    Big,
}

impl ByteOrder {
    /// Returns the `arch` token for the wire descriptor, if any.
    #[must_use]
    pub fn arch_token(&self) -> Option<&'static str> {
        match self {
            Self::Native => None,
            Self::Little => Some("little"),
            Self::Big => Some("big"),
        }
    }
}

// ============================================================================
// CubeChannel
// ============================================================================

/// Channel interpretation for a 3-plane cube.
///
/// Legal only for 3D data whose leading axis extent is exactly 3; see
/// [`validate_cube`](crate::codec::validate_cube).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeChannel {
    /// Red/green/blue planes.
    Rgb,
    /// Hue/lightness/saturation planes.
    Hls,
    /// Hue/saturation/value planes.
    Hsv,
}

impl CubeChannel {
    /// Returns the command token for this interpretation.
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Hls => "hls",
            Self::Hsv => "hsv",
        }
    }
}

impl fmt::Display for CubeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Per-axis extents of an array.
///
/// Rank is 2 or 3 by construction; 3D axes are ordered `(depth, height,
/// width)` with depth as the leading axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A 2D image of `(height, width)`.
    Two {
        /// Rows (the `ydim` extent).
        height: usize,
        /// Columns (the `xdim` extent).
        width: usize,
    },
    /// A 3D cube of `(depth, height, width)`.
    Three {
        /// Planes (the `zdim` extent).
        depth: usize,
        /// Rows per plane.
        height: usize,
        /// Columns per row.
        width: usize,
    },
}

impl Shape {
    /// Creates a 2D shape.
    #[inline]
    #[must_use]
    pub fn two(height: usize, width: usize) -> Self {
        Self::Two { height, width }
    }

    /// Creates a 3D shape.
    #[inline]
    #[must_use]
    pub fn three(depth: usize, height: usize, width: usize) -> Self {
        Self::Three {
            depth,
            height,
            width,
        }
    }

    /// Builds a shape from declared extents, treating zero height or width
    /// as "no data".
    ///
    /// A depth greater than 1 selects a 3D shape; otherwise the result is
    /// 2D. Returns `None` when height or width is zero — a legitimate empty
    /// condition, not a decode failure.
    #[must_use]
    pub fn from_extents(depth: usize, height: usize, width: usize) -> Option<Self> {
        if height == 0 || width == 0 {
            return None;
        }
        if depth > 1 {
            Some(Self::three(depth, height, width))
        } else {
            Some(Self::two(height, width))
        }
    }

    /// Returns the rank (2 or 3).
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        match self {
            Self::Two { .. } => 2,
            Self::Three { .. } => 3,
        }
    }

    /// Returns the total element count.
    #[must_use]
    pub fn len(&self) -> usize {
        match *self {
            Self::Two { height, width } => height * width,
            Self::Three {
                depth,
                height,
                width,
            } => depth * height * width,
        }
    }

    /// Returns `true` if any axis extent is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match *self {
            Self::Two { height, width } => height == 0 || width == 0,
            Self::Three {
                depth,
                height,
                width,
            } => depth == 0 || height == 0 || width == 0,
        }
    }

    /// Returns the width (`xdim`) extent.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        match *self {
            Self::Two { width, .. } | Self::Three { width, .. } => width,
        }
    }

    /// Returns the height (`ydim`) extent.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        match *self {
            Self::Two { height, .. } | Self::Three { height, .. } => height,
        }
    }

    /// Returns the depth (`zdim`) extent for 3D shapes.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        match *self {
            Self::Two { .. } => None,
            Self::Three { depth, .. } => Some(depth),
        }
    }
}

// ============================================================================
// ArrayData
// ============================================================================

/// Generates a length-checked typed constructor plus the matching extractor.
macro_rules! typed_access {
    ($(#[$meta:meta])* $ctor:ident, $extract:ident, $ty:ty, $elem:expr) => {
        $(#[$meta])*
        pub fn $ctor(shape: Shape, values: &[$ty]) -> Result<Self> {
            let mut bytes = Vec::with_capacity(values.len() * size_of::<$ty>());
            for v in values {
                bytes.extend_from_slice(&v.to_ne_bytes());
            }
            Self::from_raw(shape, $elem, ByteOrder::Native, bytes)
        }

        /// Extracts the values as a typed vector, honoring the stored byte
        /// order. Returns `None` when the element type does not match.
        #[must_use]
        pub fn $extract(&self) -> Option<Vec<$ty>> {
            if self.elem != $elem {
                return None;
            }
            let values = self
                .bytes
                .chunks_exact(size_of::<$ty>())
                .map(|chunk| {
                    let raw = chunk.try_into().expect("chunk width matches element");
                    match self.order {
                        ByteOrder::Native => <$ty>::from_ne_bytes(raw),
                        ByteOrder::Little => <$ty>::from_le_bytes(raw),
                        ByteOrder::Big => <$ty>::from_be_bytes(raw),
                    }
                })
                .collect();
            Some(values)
        }
    };
}

/// An owned in-memory numeric array: shape, element type, byte order, and
/// the raw memory image.
///
/// `ArrayData` is the unit both transfer operations move: sending writes
/// its bytes into a transient file, retrieving maps an exported file back
/// into one. Construction enforces the wire constraints — rank 2 or 3,
/// every axis extent positive, byte length matching shape and element
/// width — so downstream code never revalidates.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    shape: Shape,
    elem: ElementType,
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl ArrayData {
    /// Creates an array from a pre-marshalled byte buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if any axis extent is zero or the byte
    ///   length does not match `shape.len() * elem.size_of()`.
    pub fn from_raw(
        shape: Shape,
        elem: ElementType,
        order: ByteOrder,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::invalid_argument(format!(
                "array axes must all be positive, got {shape:?}"
            )));
        }

        let expected = shape.len() * elem.size_of();
        if bytes.len() != expected {
            return Err(Error::invalid_argument(format!(
                "byte length {} does not match shape {shape:?} of {elem} ({expected} bytes)",
                bytes.len()
            )));
        }

        Ok(Self {
            shape,
            elem,
            order,
            bytes,
        })
    }

    typed_access!(
        /// Creates a 64-bit float array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] if the value count does not
        /// match the shape or any axis extent is zero.
        from_f64, to_f64_vec, f64, ElementType::Float64
    );

    typed_access!(
        /// Creates a 32-bit float array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_f32, to_f32_vec, f32, ElementType::Float32
    );

    typed_access!(
        /// Creates a signed 64-bit integer array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_i64, to_i64_vec, i64, ElementType::Int64
    );

    typed_access!(
        /// Creates a signed 32-bit integer array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_i32, to_i32_vec, i32, ElementType::Int32
    );

    typed_access!(
        /// Creates a signed 16-bit integer array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_i16, to_i16_vec, i16, ElementType::Int16
    );

    typed_access!(
        /// Creates a signed 8-bit integer array.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_i8, to_i8_vec, i8, ElementType::Int8
    );

    typed_access!(
        /// Creates an unsigned 64-bit integer array in native byte order.
        ///
        /// Encodes with the signed 64-bit code; values with the top bit set
        /// reinterpret under two's complement.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_u64, to_u64_vec, u64, ElementType::UInt64
    );

    typed_access!(
        /// Creates an unsigned 32-bit integer array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_u32, to_u32_vec, u32, ElementType::UInt32
    );

    typed_access!(
        /// Creates an unsigned 16-bit integer array in native byte order.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_u16, to_u16_vec, u16, ElementType::UInt16
    );

    typed_access!(
        /// Creates an unsigned 8-bit integer array.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
        from_u8, to_u8_vec, u8, ElementType::UInt8
    );

    /// Creates a boolean array, one byte per element.
    ///
    /// Booleans have no wire representation of their own and are promoted
    /// to 8-bit signed integers at encode time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on a shape/value mismatch.
    pub fn from_bool(shape: Shape, values: &[bool]) -> Result<Self> {
        let bytes = values.iter().map(|&b| b as u8).collect();
        Self::from_raw(shape, ElementType::Bool, ByteOrder::Native, bytes)
    }

    /// Extracts boolean values. Returns `None` for non-boolean arrays.
    #[must_use]
    pub fn to_bool_vec(&self) -> Option<Vec<bool>> {
        if self.elem != ElementType::Bool {
            return None;
        }
        Some(self.bytes.iter().map(|&b| b != 0).collect())
    }
}

// ============================================================================
// ArrayData - Accessors
// ============================================================================

impl ArrayData {
    /// Returns the shape.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Returns the element type.
    #[inline]
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.elem
    }

    /// Returns the byte order.
    #[inline]
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Returns the raw memory image.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the element count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// Returns `true` if the array holds no elements.
    ///
    /// Always `false` for a constructed value; present for API symmetry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shape.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
