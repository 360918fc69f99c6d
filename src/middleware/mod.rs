// SPDX-License-Identifier: MIT
// Copyright 2026 The wod-tracker authors

//! Middleware modules (authentication, security, etc.).

pub mod auth;
pub mod security;

pub use auth::{require_admin, require_auth, AuthUser};
