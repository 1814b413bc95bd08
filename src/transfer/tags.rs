//! File sub-protocol tags
//!
//! File data rides inside ordinary `!msg` payloads:
//!
//! - `<file|id|filename|filesize>` + base64: first chunk (sequence 0)
//! - `<file|id|seq>` + base64: every later chunk
//! - `</file|id|total>`: terminal marker, no data
//!
//! An older header form, `<file|id|filename>`, carries no size.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use log::debug;

/// Bytes of file data per chunk, before base64
pub const CHUNK_SIZE: usize = 16384;

const OPEN_TAG: &str = "<file|";
const END_TAG: &str = "</file|";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTag {
    Header {
        id: u32,
        filename: String,
        size: Option<u64>,
        data: String,
    },
    Chunk {
        id: u32,
        seq: u32,
        data: String,
    },
    End {
        id: u32,
        total_chunks: u32,
    },
}

impl FileTag {
    pub fn id(&self) -> u32 {
        match self {
            FileTag::Header { id, .. } | FileTag::Chunk { id, .. } | FileTag::End { id, .. } => {
                *id
            }
        }
    }

    /// Parse a raw (unescaped) message payload. Anything that is not a
    /// well-formed tag yields `None`.
    pub fn parse(payload: &str) -> Option<FileTag> {
        if let Some(rest) = payload.strip_prefix(END_TAG) {
            let (params, _) = rest.split_once('>')?;
            let (id, total) = params.split_once('|')?;
            return Some(FileTag::End {
                id: id.parse().ok()?,
                total_chunks: total.parse().ok()?,
            });
        }

        let rest = payload.strip_prefix(OPEN_TAG)?;
        let (header, data) = rest.split_once('>')?;
        let (id, detail) = header.split_once('|')?;
        let id: u32 = id.parse().ok()?;
        let data = data.to_string();

        if let Ok(seq) = detail.parse::<u32>() {
            return Some(FileTag::Chunk { id, seq, data });
        }

        let (filename, size) = match detail.rsplit_once('|') {
            Some((filename, size)) => match size.parse::<u64>() {
                Ok(size) => (filename, Some(size)),
                Err(_) => (detail, None),
            },
            None => (detail, None),
        };

        Some(FileTag::Header {
            id,
            filename: filename.to_string(),
            size,
            data,
        })
    }

    pub fn encode(&self) -> String {
        match self {
            FileTag::Header {
                id,
                filename,
                size: Some(size),
                data,
            } => format!("{}{}|{}|{}>{}", OPEN_TAG, id, filename, size, data),
            FileTag::Header {
                id,
                filename,
                size: None,
                data,
            } => format!("{}{}|{}>{}", OPEN_TAG, id, filename, data),
            FileTag::Chunk { id, seq, data } => format!("{}{}|{}>{}", OPEN_TAG, id, seq, data),
            FileTag::End { id, total_chunks } => format!("{}{}|{}>", END_TAG, id, total_chunks),
        }
    }
}

pub fn encode_chunk(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode chunk data; undecodable data yields `None`.
pub fn decode_chunk(data: &str) -> Option<Vec<u8>> {
    let trimmed = data.trim_end_matches(['\r', '\n', ' ']);
    match BASE64.decode(trimmed) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            debug!("Undecodable chunk data ({} chars): {}", trimmed.len(), e);
            None
        }
    }
}
