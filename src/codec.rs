//! Transport encoding of chunk payloads: standard base64 around canonical JSON.
//!
//! Decoding never falls back to defaults. Padding is required; CR and LF are
//! skipped so that line-wrapped payloads from MIME-style encoders decode.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::core::{Error, Result};
use crate::model::ChunkData;

pub fn decode_chunk(encoded: &str) -> Result<ChunkData> {
    let compact: String = encoded.chars().filter(|c| *c != '\r' && *c != '\n').collect();
    let json = BASE64
        .decode(compact.as_bytes())
        .map_err(|err| Error::Decode(format!("invalid base64 input: {err}")))?;
    serde_json::from_slice(&json)
        .map_err(|err| Error::Decode(format!("invalid chunk document: {err}")))
}

pub fn encode_chunk(chunk: &ChunkData) -> Result<String> {
    Ok(BASE64.encode(chunk.canonical_bytes()?))
}
