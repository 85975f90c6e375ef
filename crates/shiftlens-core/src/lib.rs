// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the shiftlens capture service.
//!
//! This crate provides the error taxonomy, the domain types persisted by the
//! storage layer, and the trait seams through which external collaborators
//! (the blob store and the notification transport) are injected. All other
//! workspace crates depend on this one and nothing here depends on a driver.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ShiftlensError;
pub use traits::{NotificationSender, ObjectStore};
pub use types::{
    CaptureImage, CaptureSession, DispatchOutcome, NewScheduleNotification, NotificationStatus,
    ScheduleNotification, SessionState,
};
