// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload-mode decisions and reply texts for the capture ingress.
//!
//! The adapter is deliberately stateless: all grouping truth lives in the
//! store, and these handlers just translate commands and uploads into
//! repository calls. Every path ends in a reply string; errors never reach
//! the transport.

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use shiftlens_core::{ObjectStore, SessionState, ShiftlensError};
use shiftlens_storage::Database;
use shiftlens_storage::queries::{images, sessions};

use crate::commands::ScheduleCommand;

/// Catch-all reply for failures the user cannot act on.
pub const GENERIC_FAILURE_REPLY: &str = "Something went wrong, please try again.";

/// Reply for uploads that are not schedule screenshots.
pub const INVALID_MEDIA_REPLY: &str =
    "Unsupported upload. Send schedule screenshots as a photo or an image file.";

/// Reply for plain text that is not a command.
pub const USAGE_REPLY: &str =
    "Send schedule screenshots as photos. Commands: /start_session, /close, /done.";

/// Shared dependencies of the ingress handlers.
///
/// `db` is `None` when no `storage.database_url` is configured; every
/// stateful path then falls back to the generic failure reply.
pub struct IngressDeps {
    pub db: Option<Database>,
    pub blob: std::sync::Arc<dyn ObjectStore>,
}

/// Handle one of the three session commands and produce the reply text.
pub async fn handle_command(
    deps: &IngressDeps,
    cancel: &CancellationToken,
    user_id: i64,
    command: ScheduleCommand,
) -> String {
    let Some(db) = &deps.db else {
        warn!(user_id, "command received but persistence is disabled");
        return GENERIC_FAILURE_REPLY.to_string();
    };

    let result = match command {
        ScheduleCommand::StartSession => start_session(db, cancel, user_id).await,
        ScheduleCommand::Close | ScheduleCommand::Done => close_session(db, cancel, user_id).await,
    };

    result.unwrap_or_else(|e| {
        error!(user_id, error = %e, "command handling failed");
        GENERIC_FAILURE_REPLY.to_string()
    })
}

async fn start_session(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<String, ShiftlensError> {
    match sessions::create(db, cancel, user_id).await {
        Ok(session) => Ok(format!(
            "Capture session {} opened. Send your schedule screenshots, then /done.",
            session.id
        )),
        Err(ShiftlensError::UniquenessConflict { .. }) => {
            // Lost a concurrent start; both callers end up on the same row.
            let existing = sessions::get_open(db, cancel, user_id).await?.ok_or_else(|| {
                ShiftlensError::Internal(format!(
                    "open session for user {user_id} vanished after conflict"
                ))
            })?;
            Ok(format!(
                "Capture session {} is already open. Send screenshots, then /done.",
                existing.id
            ))
        }
        Err(e) => Err(e),
    }
}

async fn close_session(
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
) -> Result<String, ShiftlensError> {
    match sessions::close_open(db, cancel, user_id).await? {
        Some(session) => {
            let count = images::count_by_session(db, cancel, session.id).await?;
            Ok(format!(
                "Capture session {} closed with {} image(s).",
                session.id, count
            ))
        }
        None => Ok("No open capture session. Send a screenshot or /start_session first.".to_string()),
    }
}

/// Handle a valid screenshot upload and produce the reply text.
///
/// Picks between the two upload modes: appending into an existing open
/// session, or implicit single-upload (open, append, auto-close in this one
/// handler).
pub async fn handle_upload(
    deps: &IngressDeps,
    cancel: &CancellationToken,
    user_id: i64,
    bytes: &[u8],
    extension: &str,
    external_message_id: Option<i64>,
) -> String {
    let Some(db) = &deps.db else {
        warn!(user_id, "upload received but persistence is disabled");
        return GENERIC_FAILURE_REPLY.to_string();
    };

    match store_upload(deps, db, cancel, user_id, bytes, extension, external_message_id).await {
        Ok(reply) => reply,
        Err(ShiftlensError::IllegalState(_)) => {
            "This capture session is no longer open. Start a new one with /start_session."
                .to_string()
        }
        Err(ShiftlensError::UniquenessConflict { .. }) => {
            // The object key or message id is already stored: a retried
            // delivery, not a failure.
            "This screenshot is already stored.".to_string()
        }
        Err(e) => {
            error!(user_id, error = %e, "upload handling failed");
            GENERIC_FAILURE_REPLY.to_string()
        }
    }
}

async fn store_upload(
    deps: &IngressDeps,
    db: &Database,
    cancel: &CancellationToken,
    user_id: i64,
    bytes: &[u8],
    extension: &str,
    external_message_id: Option<i64>,
) -> Result<String, ShiftlensError> {
    let object_key = deps.blob.put(bytes, extension).await?;

    if let Some(session) = sessions::get_open(db, cancel, user_id).await? {
        let image =
            images::append_next(db, cancel, session.id, &object_key, external_message_id).await?;
        return Ok(format!(
            "Stored image {} of session {}.",
            image.sequence, session.id
        ));
    }

    // No open session: implicit single-upload mode.
    let session = match sessions::create(db, cancel, user_id).await {
        Ok(session) => session,
        Err(ShiftlensError::UniquenessConflict { .. }) => {
            // A concurrent upload opened a session first; join it instead of
            // auto-closing.
            let session = sessions::get_open(db, cancel, user_id).await?.ok_or_else(|| {
                ShiftlensError::Internal(format!(
                    "open session for user {user_id} vanished after conflict"
                ))
            })?;
            let image =
                images::append_next(db, cancel, session.id, &object_key, external_message_id)
                    .await?;
            return Ok(format!(
                "Stored image {} of session {}.",
                image.sequence, session.id
            ));
        }
        Err(e) => return Err(e),
    };

    let image =
        images::append_next(db, cancel, session.id, &object_key, external_message_id).await?;
    sessions::update_state(db, cancel, session.id, SessionState::Closed, None).await?;
    Ok(format!(
        "Stored image {} of session {} (single-upload mode, session auto-closed).",
        image.sequence, session.id
    ))
}
