// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media extraction for schedule screenshot uploads.
//!
//! A valid upload is a Telegram photo or a document with an `image/*` MIME
//! type. Everything else is reported as invalid so the caller can reply
//! without touching any state.

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{Document, FileMeta};
use tracing::debug;

use shiftlens_core::ShiftlensError;

/// Downloaded screenshot bytes plus the extension the blob key should carry.
#[derive(Debug)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Fetch the bytes behind a Telegram file reference.
///
/// Two round-trips: `getFile` to resolve the server-side path, then the
/// actual content download. Both failures surface as `Channel` errors.
pub async fn download_file(bot: &Bot, file_meta: &FileMeta) -> Result<Vec<u8>, ShiftlensError> {
    let resolved = bot
        .get_file(file_meta.id.clone())
        .await
        .map_err(|e| ShiftlensError::Channel {
            message: format!("telegram getFile lookup failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    // Telegram reports the size up front; pre-size the buffer to match.
    let mut bytes = Vec::with_capacity(resolved.meta.size as usize);
    bot.download_file(&resolved.path, &mut bytes)
        .await
        .map_err(|e| ShiftlensError::Channel {
            message: format!("screenshot download failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    debug!(
        file_id = %file_meta.id,
        bytes = bytes.len(),
        "fetched screenshot from Telegram"
    );
    Ok(bytes)
}

/// Whether a document qualifies as a schedule screenshot upload.
pub fn is_image_document(doc: &Document) -> bool {
    doc.mime_type
        .as_ref()
        .map(|m| m.to_string().starts_with("image/"))
        .unwrap_or(false)
}

/// Extension for an image document, derived from the MIME subtype.
fn document_extension(doc: &Document) -> String {
    doc.mime_type
        .as_ref()
        .map(|m| m.subtype().to_string())
        .unwrap_or_else(|| "jpg".to_string())
}

/// Extract a valid screenshot upload from a message.
///
/// Returns `Ok(None)` for messages that carry no valid image (the caller
/// replies with the invalid-media text). Photos use the largest size variant
/// Telegram provides, which is the last in the array.
pub async fn extract_upload(bot: &Bot, msg: &Message) -> Result<Option<Upload>, ShiftlensError> {
    if let Some(photos) = msg.photo() {
        let largest = photos.last().ok_or_else(|| ShiftlensError::Channel {
            message: "photo array is empty".into(),
            source: None,
        })?;
        let bytes = download_file(bot, &largest.file).await?;
        return Ok(Some(Upload {
            bytes,
            extension: "jpg".to_string(),
        }));
    }

    if let Some(doc) = msg.document() {
        if !is_image_document(doc) {
            debug!(msg_id = msg.id.0, "ignoring non-image document");
            return Ok(None);
        }
        let extension = document_extension(doc);
        let bytes = download_file(bot, &doc.file).await?;
        return Ok(Some(Upload { bytes, extension }));
    }

    debug!(msg_id = msg.id.0, "ignoring unsupported message type");
    Ok(None)
}
