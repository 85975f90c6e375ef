// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background dispatchers for the shiftlens capture service.
//!
//! Two single-task cooperative loops coordinate everything through the
//! store: the claim dispatcher promotes closed capture sessions to
//! processing for the downstream OCR worker, and the delivery dispatcher
//! drains the pending notification queue. Both honour a shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and swallow
//! per-cycle errors so a flaky store never kills the loop.

pub mod notifications;
pub mod sessions;
pub mod shutdown;

pub use notifications::DeliveryDispatcher;
pub use sessions::ClaimDispatcher;
pub use shutdown::install_signal_handler;
