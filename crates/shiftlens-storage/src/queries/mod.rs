// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query operations, one module per entity.

pub mod images;
pub mod notifications;
pub mod sessions;
