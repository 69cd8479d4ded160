//! Pluggable compression codecs.
//!
//! The spec treats the codec as a pure byte-buffer transform external to
//! the cache engine and explicitly excludes its internals from scope. This
//! module still needs a real implementation behind the trait to exercise
//! the store/load paths and the ratio-based admission policy, so it keeps
//! two: a dependency-free default and a `flate2`-backed alternate,
//! following the teacher's convention of implementing codecs in-crate
//! (`compression/algorithms/lz4_compression.rs`,
//! `compression/algorithms/zstd_compression.rs`) rather than reaching for
//! an external compression crate as the *only* option.

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// A boot-time-selected, stateless byte compressor.
///
/// `compress`/`decompress` run in the non-sleepable window the spec
/// describes for C1/C3 (§5): no allocation that could legitimately block,
/// no I/O. Implementations must be deterministic — the design in spec §7.3
/// leans on that determinism to treat any length mismatch on decompress as
/// memory corruption rather than a codec bug.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compress `src` into `dst`, returning the number of bytes written.
    /// `dst` is sized `2 * PAGE_SIZE` (the scratch buffer) so even
    /// pathologically incompressible input always fits.
    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize>;

    /// Decompress `src` into `dst`. `dst.len()` is always exactly the
    /// original page size; any other output length is corruption (spec
    /// §7.3), not a recoverable error.
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<()>;
}

/// Resolve a codec by name, falling back to [`default_codec`] with a
/// warning if the name is unrecognized (spec §6: "Boot-time: codec name
/// with fallback to a built-in default if the requested codec is
/// unavailable").
pub fn by_name(name: &str) -> Box<dyn Codec> {
    match name {
        "byterun" => Box::new(ByteRunCodec),
        "deflate" => Box::new(DeflateCodec),
        other => {
            tracing::warn!(requested = other, "unknown codec, falling back to built-in default");
            default_codec()
        }
    }
}

/// The built-in default: a small run-length coder. Cheap, dependency-free,
/// deterministic, and — like the pages a real page-reclaim workload
/// actually compresses well — good at collapsing long runs of a repeated
/// byte while reliably failing the ratio check on high-entropy input.
pub struct ByteRunCodec;

impl Codec for ByteRunCodec {
    fn name(&self) -> &'static str {
        "byterun"
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let mut out = 0usize;
        let mut i = 0usize;
        while i < src.len() {
            let byte = src[i];
            let mut run = 1usize;
            while i + run < src.len() && src[i + run] == byte && run < 255 {
                run += 1;
            }
            if out + 2 > dst.len() {
                return Err(Error::Rejected(crate::error::Rejection::Codec));
            }
            dst[out] = run as u8;
            dst[out + 1] = byte;
            out += 2;
            i += run;
        }
        Ok(out)
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        let mut out = 0usize;
        let mut i = 0usize;
        while i + 1 < src.len() {
            let run = src[i] as usize;
            let byte = src[i + 1];
            if out + run > dst.len() {
                return Err(Error::Corruption("byterun decode overruns destination"));
            }
            dst[out..out + run].fill(byte);
            out += run;
            i += 2;
        }
        if out != dst.len() {
            return Err(Error::Corruption("byterun decode underfilled destination"));
        }
        Ok(())
    }
}

/// A real, general-purpose alternate codec wrapping the crate's `flate2`
/// dependency — demonstrates that the `Codec` trait accommodates an
/// actual external compressor without touching `store`/`writeback` call
/// sites.
pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        use flate2::write::DeflateEncoder;
        use flate2::Compression;

        let mut encoder = DeflateEncoder::new(Vec::with_capacity(dst.len()), Compression::fast());
        encoder
            .write_all(src)
            .map_err(|_| Error::Rejected(crate::error::Rejection::Codec))?;
        let compressed = encoder
            .finish()
            .map_err(|_| Error::Rejected(crate::error::Rejection::Codec))?;
        if compressed.len() > dst.len() {
            return Err(Error::Rejected(crate::error::Rejection::Codec));
        }
        dst[..compressed.len()].copy_from_slice(&compressed);
        Ok(compressed.len())
    }

    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<()> {
        use flate2::read::DeflateDecoder;

        let mut decoder = DeflateDecoder::new(src);
        let mut out = Vec::with_capacity(dst.len());
        decoder
            .read_to_end(&mut out)
            .map_err(|_| Error::Corruption("deflate decode failed"))?;
        if out.len() != dst.len() {
            return Err(Error::Corruption("deflate decode length mismatch"));
        }
        dst.copy_from_slice(&out);
        Ok(())
    }
}

pub fn default_codec() -> Box<dyn Codec> {
    Box::new(ByteRunCodec)
}
