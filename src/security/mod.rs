// ABOUTME: Security module organization
// ABOUTME: Audit event construction from request metadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

/// Audit event construction and recording
pub mod audit;

pub use audit::AuditRecorder;
