//! Export file format for the in-process store.
//!
//! Layout:
//! ```text
//! magic "DBX\0" | version u8 | crc32(body) u32 LE | body length u64 LE | body
//! ```
//! The body is MessagePack: collection path -> document id -> fields.

use super::memory::Collections;
use crate::error::{BindError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Magic bytes for export files.
const EXPORT_MAGIC: &[u8; 4] = b"DBX\0";

/// Current export format version.
const EXPORT_VERSION: u8 = 1;

/// magic + version + crc + length
const HEADER_LEN: usize = 4 + 1 + 4 + 8;

#[derive(Serialize, Deserialize)]
struct ExportBody {
    collections: Collections,
}

/// Write `collections` to `path` (temp file, then rename).
pub(crate) fn write_export(path: &Path, collections: &Collections) -> Result<()> {
    let body = rmp_serde::to_vec_named(&ExportBody {
        collections: collections.clone(),
    })?;
    let checksum = crc32fast::hash(&body);

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(EXPORT_MAGIC)?;
        file.write_all(&[EXPORT_VERSION])?;
        file.write_all(&checksum.to_le_bytes())?;
        file.write_all(&(body.len() as u64).to_le_bytes())?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!(
        path = %path.display(),
        bytes = body.len(),
        collections = collections.len(),
        "store exported"
    );
    Ok(())
}

/// Read and verify an export file.
pub(crate) fn read_export(path: &Path) -> Result<Collections> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_LEN {
        return Err(BindError::Corruption(format!(
            "export file truncated: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[0..4] != EXPORT_MAGIC {
        return Err(BindError::InvalidFormat("bad magic".to_string()));
    }
    if bytes[4] != EXPORT_VERSION {
        return Err(BindError::InvalidFormat(format!(
            "unsupported version {}",
            bytes[4]
        )));
    }

    let expected = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[9..17]);
    let body_len = u64::from_le_bytes(len_bytes) as usize;

    let body = &bytes[HEADER_LEN..];
    if body.len() != body_len {
        return Err(BindError::Corruption(format!(
            "body length {} does not match header {}",
            body.len(),
            body_len
        )));
    }

    let got = crc32fast::hash(body);
    if got != expected {
        return Err(BindError::ChecksumMismatch { expected, got });
    }

    let decoded: ExportBody = rmp_serde::from_slice(body)?;
    Ok(decoded.collections)
}
