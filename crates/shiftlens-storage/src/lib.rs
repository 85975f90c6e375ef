// SPDX-FileCopyrightText: 2026 Shiftlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres persistence layer for the shiftlens capture service.
//!
//! Provides a pooled connection handle with embedded migrations, translation
//! of store error codes into the shared error taxonomy, and typed query
//! modules for capture sessions, their images, and the outbound notification
//! queue. All invariants that matter under concurrency (single open session
//! per user, gap-free sequences, exclusive claims) are enforced by the
//! schema and its triggers, not by application-side checks.

pub mod database;
pub mod models;
pub mod queries;

pub use database::Database;
