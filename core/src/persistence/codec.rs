//! Byte-level payload codecs. The persistence layer treats these as opaque:
//! JSON goes in, bytes come out, and the reverse.

use crate::error::PersistenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("LZ4 decompression failed: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),

    #[error("Unknown payload codec '{0}'")]
    Unknown(String),
}

impl From<CodecError> for PersistenceError {
    fn from(e: CodecError) -> Self {
        PersistenceError::CompressionFailure(e.to_string())
    }
}

pub trait PayloadCodec: Send + Sync {
    /// Stable name, stored next to every payload so it can be decoded later.
    fn name(&self) -> &'static str;
    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Identity codec. Payloads stay readable JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl PayloadCodec for PlainCodec {
    fn name(&self) -> &'static str { "plain" }

    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(raw.to_vec())
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(encoded.to_vec())
    }
}

/// LZ4 block format with the uncompressed size prepended.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl PayloadCodec for Lz4Codec {
    fn name(&self) -> &'static str { "lz4" }

    fn encode(&self, raw: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::compress_prepend_size(raw))
    }

    fn decode(&self, encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::decompress_size_prepended(encoded)?)
    }
}

pub fn codec_by_name(name: &str) -> Result<Box<dyn PayloadCodec>, CodecError> {
    match name {
        "plain" => Ok(Box::new(PlainCodec)),
        "lz4"   => Ok(Box::new(Lz4Codec)),
        other   => Err(CodecError::Unknown(other.to_string())),
    }
}
