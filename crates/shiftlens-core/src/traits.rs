// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams for external collaborators.
//!
//! The core coordinates everything through the relational store; the two
//! collaborators it talks to directly are injected behind these traits so
//! the ingress adapter and the delivery dispatcher stay transport-agnostic.

use async_trait::async_trait;

use crate::error::ShiftlensError;
use crate::types::ScheduleNotification;

/// Content-addressed blob storage.
///
/// The core only ever sees the final object key string; where the bytes land
/// (filesystem, bucket, ...) is the implementation's business.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` and return its object key.
    ///
    /// Storing the same bytes twice returns the same key without rewriting;
    /// the key is the idempotency anchor for image appends.
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<String, ShiftlensError>;

    /// Fetch the bytes behind a previously returned key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ShiftlensError>;
}

/// Outbound delivery callback used by the notification dispatcher.
///
/// Implementations perform the external chat-API call. A `Cancelled` error
/// must be propagated untouched so the dispatcher can abort the batch
/// without writing any status.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &ScheduleNotification) -> Result<(), ShiftlensError>;
}
