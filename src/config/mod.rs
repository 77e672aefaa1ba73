// ABOUTME: Configuration module organization for the Embedchat server
// ABOUTME: Environment-only configuration, no config files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

/// Environment variable driven server configuration
pub mod environment;

pub use environment::ServerConfig;
