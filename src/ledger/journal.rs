//! Append-only transaction journal.
//!
//! Layout: a flat file of frames, one committed transaction per frame:
//!
//! ```text
//! [len u32 LE][crc32 u32 LE][payload: JSON block, len bytes]
//! ```
//!
//! On open the journal is replayed front to back. A frame that is cut short
//! or fails its checksum marks a torn tail: it and everything after it are
//! truncated away, and the blocks before it are returned.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::StoreError;
use crate::model::wire;

pub const FRAME_HEADER_LEN: usize = 8;
/// Upper bound on a single frame payload.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// The writes of one committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub tx_id: String,
    #[serde(with = "wire::timestamp")]
    pub timestamp: OffsetDateTime,
    pub writes: Vec<BlockWrite>,
}

/// One key write; `None` is a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWrite {
    pub key: String,
    #[serde(with = "base64_value")]
    pub value: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct Journal {
    file: File,
    len: u64,
}

impl Journal {
    /// Opens or creates the journal at `path`, returning every intact block.
    pub fn open(path: &Path) -> Result<(Self, Vec<Block>), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let (blocks, valid_len) = decode_frames(&bytes)?;

        if valid_len < bytes.len() {
            warn!(
                "journal {}: truncating torn tail of {} bytes at offset {}",
                path.display(),
                bytes.len() - valid_len,
                valid_len
            );
            file.set_len(valid_len as u64)?;
            file.sync_all()?;
        }
        file.seek(SeekFrom::Start(valid_len as u64))?;

        Ok((
            Self {
                file,
                len: valid_len as u64,
            },
            blocks,
        ))
    }

    /// Appends one block and syncs it to disk.
    ///
    /// On failure the file is cut back to the last intact frame, so a later
    /// append never lands behind a partial one.
    pub fn append(&mut self, block: &Block) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(block)?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(StoreError::Corrupt(format!(
                "block {} exceeds the frame limit ({} bytes)",
                block.tx_id,
                payload.len()
            )));
        }
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        if let Err(err) = self.write_frame(&frame) {
            self.rollback();
            return Err(err.into());
        }
        self.len += frame.len() as u64;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        self.file.sync_data()
    }

    fn rollback(&mut self) {
        let result = self
            .file
            .set_len(self.len)
            .and_then(|()| self.file.seek(SeekFrom::Start(self.len)).map(|_| ()));
        if let Err(err) = result {
            warn!("journal: could not roll back to offset {}: {err}", self.len);
        }
    }

    /// Bytes of intact frames on disk.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Decodes frames until the first incomplete or corrupt one.
///
/// Returns the blocks and the byte length of the intact prefix. A frame whose
/// checksum holds but whose payload is not a block is real corruption, not a
/// torn write, and fails the open.
fn decode_frames(bytes: &[u8]) -> Result<(Vec<Block>, usize), StoreError> {
    let mut blocks = Vec::new();
    let mut offset = 0usize;

    while offset + FRAME_HEADER_LEN <= bytes.len() {
        let len = read_u32(bytes, offset) as usize;
        let crc = read_u32(bytes, offset + 4);
        if len > MAX_FRAME_LEN {
            break;
        }
        let start = offset + FRAME_HEADER_LEN;
        let end = start + len;
        if end > bytes.len() {
            break;
        }
        let payload = &bytes[start..end];
        if crc32fast::hash(payload) != crc {
            break;
        }
        let block: Block = serde_json::from_slice(payload).map_err(|err| {
            StoreError::Corrupt(format!("journal frame at offset {offset}: {err}"))
        })?;
        blocks.push(block);
        offset = end;
    }

    Ok((blocks, offset))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

mod base64_value {
    use super::BASE64;
    use base64::Engine;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => BASE64.decode(text.as_bytes()).map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}
