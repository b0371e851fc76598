//! Array codec: wire descriptors and bit-depth decoding.
//!
//! Pure, stateless translation between an in-memory [`ArrayData`] and the
//! peer's flat-file array description. The codec never touches the bus; it
//! produces the `key=value` descriptor that rides alongside a transfer
//! command, and maps a declared bit-depth/extent triple back into an array
//! layout when retrieving.
//!
//! # Wire descriptor
//!
//! An ordered `key=value` list: `xdim`, `ydim`, `zdim` (3D only), `bitpix`,
//! and `arch` (only for an explicit non-native byte order), e.g.
//!
//! ```text
//! xdim=500,ydim=200,bitpix=-64
//! xdim=30,ydim=20,zdim=3,bitpix=16,arch=little
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Array buffer and element/shape/order vocabulary.
pub mod array;

// ============================================================================
// Re-exports
// ============================================================================

pub use array::{ArrayData, ByteOrder, CubeChannel, ElementType, Shape};

use crate::error::{Error, Result};

// ============================================================================
// Encoding
// ============================================================================

/// Builds the wire descriptor for an array.
///
/// The raw bytes accompanying the descriptor are [`ArrayData::as_bytes`];
/// together they round-trip through [`decode_shape`] to the same shape and
/// element values, modulo the documented unsigned-to-signed and
/// bool-to-`Int8` policies.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] when the element type has no bit-depth
/// code ([`ElementType::Float16`] is decode-only).
pub fn wire_descriptor(array: &ArrayData) -> Result<String> {
    let bitpix = array.element_type().bitpix()?;
    let shape = array.shape();

    let mut tokens = Vec::with_capacity(5);
    tokens.push(format!("xdim={}", shape.width()));
    tokens.push(format!("ydim={}", shape.height()));
    if let Some(depth) = shape.depth() {
        tokens.push(format!("zdim={depth}"));
    }
    tokens.push(format!("bitpix={bitpix}"));
    if let Some(arch) = array.byte_order().arch_token() {
        tokens.push(format!("arch={arch}"));
    }

    Ok(tokens.join(","))
}

// ============================================================================
// Decoding
// ============================================================================

/// Maps a declared bit-depth code and axis extents to an array layout.
///
/// Extents of `(depth > 1, height, width)` select a 3D shape; otherwise the
/// layout is 2D `(height, width)`. Zero height or width is the "no data"
/// condition and yields `Ok(None)` rather than a failure, so callers can
/// surface it as an absent result.
///
/// # Errors
///
/// Returns [`Error::UnknownFormat`] for a bit-depth code outside
/// `{-64, -32, -16, 64, 32, 16, 8}`.
pub fn decode_shape(
    bitpix: i32,
    depth: usize,
    height: usize,
    width: usize,
) -> Result<Option<(ElementType, Shape)>> {
    let elem = ElementType::from_bitpix(bitpix)?;
    Ok(Shape::from_extents(depth, height, width).map(|shape| (elem, shape)))
}

// ============================================================================
// Cube Validation
// ============================================================================

/// Checks that a requested channel interpretation is legal for a shape.
///
/// A [`CubeChannel`] may only be applied to 3D data whose leading axis
/// extent is exactly 3 (one plane per channel). Runs before any bus
/// interaction.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a 2D shape or a cube whose depth
/// is not 3.
pub fn validate_cube(shape: Shape, cube: Option<CubeChannel>) -> Result<()> {
    let Some(cube) = cube else {
        return Ok(());
    };

    match shape.depth() {
        Some(3) => Ok(()),
        Some(depth) => Err(Error::invalid_argument(format!(
            "{cube} interpretation needs a leading axis of 3, got {depth}"
        ))),
        None => Err(Error::invalid_argument(format!(
            "{cube} interpretation needs 3D data, got a 2D array"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
