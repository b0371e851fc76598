//! Array send/retrieve operations.
//!
//! Arrays move between this process and the peer through a transient
//! transfer file: a raw little/big/native-endian dump matching the declared
//! element type and shape, no header. The file exists only for the duration
//! of one operation, is exclusively owned by it, and is removed on every
//! exit path — [`NamedTempFile`] deletes on drop, so early returns and `?`
//! propagation clean up the same as the happy path.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::codec::{self, ArrayData, ByteOrder, CubeChannel};
use crate::error::{Error, Result};

use super::Session;

// ============================================================================
// Session - Array Transfer
// ============================================================================

impl Session {
    /// Sends an array to the peer's current frame.
    ///
    /// Steps: validate the cube interpretation, make sure a frame exists
    /// (probing `frame active` and issuing `frame new` when the probe comes
    /// back absent — the transfer command fails without a frame), dump the
    /// raw bytes to a transfer file, select the channel interpretation if
    /// one was requested, then issue the transfer command:
    ///
    /// ```text
    /// [rgb|hls|hsv ]array[ mask] [xdim=..,ydim=..(,zdim=..),bitpix=..(,arch=..)] <path>
    /// ```
    ///
    /// Returns `Ok(false)` when the peer rejects a step (reported through
    /// the sink, non-fatal).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an illegal cube/shape combination
    ///   (before any bus traffic).
    /// - [`Error::UnsupportedType`] when the element type cannot be encoded.
    /// - Transport faults from the underlying calls.
    pub async fn send_array(
        &self,
        array: &ArrayData,
        cube: Option<CubeChannel>,
        as_mask: bool,
        timeout: Option<u32>,
    ) -> Result<bool> {
        codec::validate_cube(array.shape(), cube)?;
        let descriptor = codec::wire_descriptor(array)?;
        let timeout = self.effective_timeout(timeout);

        // The transfer command needs an existing frame.
        if self.get_with_timeout("frame active", timeout).await?.is_none() {
            self.set_with_timeout("frame new", timeout).await?;
        }

        let mut file = NamedTempFile::new()?;
        file.write_all(array.as_bytes())?;
        file.flush()?;
        debug!(
            path = %file.path().display(),
            bytes = array.as_bytes().len(),
            "staged array for transfer"
        );

        if let Some(cube) = cube {
            self.set_with_timeout(cube.token(), timeout).await?;
        }

        let mut command = String::new();
        if let Some(cube) = cube {
            command.push_str(cube.token());
            command.push(' ');
        }
        command.push_str("array");
        if as_mask {
            command.push_str(" mask");
        }
        command.push_str(&format!(" [{descriptor}] {}", file.path().display()));

        self.set_with_timeout(&command, timeout).await
        // `file` drops here: the transfer file is removed on every path.
    }

    /// Retrieves the peer's current array.
    ///
    /// Probes `fits bitpix` / `fits width` / `fits height` / `fits depth`
    /// (absent probes default to 0), then directs the peer to export its
    /// raw data into a transfer file and maps the bytes back into an
    /// [`ArrayData`] in native byte order.
    ///
    /// Returns `Ok(None)` — with a reported message — when the frame holds
    /// no data (zero width or height) or declares an unrecognized bit
    /// depth. No export is attempted in either case.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] when a probe reply is non-numeric or the
    ///   exported byte count does not match the declared layout.
    /// - Transport faults from the underlying calls.
    pub async fn retrieve_array(&self, timeout: Option<u32>) -> Result<Option<ArrayData>> {
        let timeout = self.effective_timeout(timeout);

        let bitpix = self.scalar_probe("fits bitpix", timeout).await?;
        let width = self.scalar_probe("fits width", timeout).await?;
        let height = self.scalar_probe("fits height", timeout).await?;
        let depth = self.scalar_probe("fits depth", timeout).await?;

        if width == 0 || height == 0 {
            self.sink
                .warning_reported("the current frame has no image data");
            return Ok(None);
        }

        let bitpix = i32::try_from(bitpix)
            .map_err(|_| Error::protocol(format!("bitpix probe out of range: {bitpix}")))?;
        let [depth, height, width] = [depth, height, width].map(|extent| {
            usize::try_from(extent)
                .map_err(|_| Error::protocol(format!("negative axis extent: {extent}")))
        });
        let (depth, height, width) = (depth?, height?, width?);

        let decoded = match codec::decode_shape(bitpix, depth, height, width) {
            Ok(decoded) => decoded,
            Err(Error::UnknownFormat { bitpix }) => {
                self.sink
                    .error_reported(&format!("DS9 reported an unsupported bitpix: {bitpix}"));
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some((elem, shape)) = decoded else {
            // Unreachable after the width/height check, but kept total.
            return Ok(None);
        };

        let file = NamedTempFile::new()?;
        let command = format!("export array {} native", file.path().display());
        if !self.set_with_timeout(&command, timeout).await? {
            // Export rejected; already reported.
            return Ok(None);
        }

        let bytes = tokio::fs::read(file.path()).await?;
        let expected = shape.len() * elem.size_of();
        if bytes.len() != expected {
            return Err(Error::protocol(format!(
                "export produced {} bytes, expected {expected} for {elem} {shape:?}",
                bytes.len()
            )));
        }

        let array = ArrayData::from_raw(shape, elem, ByteOrder::Native, bytes)?;
        debug!(bytes = expected, "retrieved array");
        Ok(Some(array))
        // `file` drops here: the export file is removed on every path.
    }

    /// Issues one scalar `fits *` probe.
    ///
    /// An absent reply defaults to 0; a present but non-numeric reply is a
    /// malformed envelope, hence a transport fault.
    async fn scalar_probe(&self, command: &str, timeout: u32) -> Result<i64> {
        match self.get_with_timeout(command, timeout).await? {
            None => Ok(0),
            Some(text) => text.trim().parse().map_err(|_| {
                Error::protocol(format!("probe {command:?} returned non-numeric {text:?}"))
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
