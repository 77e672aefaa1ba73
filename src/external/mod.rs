// ABOUTME: External service clients consumed over plain HTTP
// ABOUTME: BigQuery warehouse access and inference backend forwarding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

/// BigQuery REST clients: analytics reader, audit logger, OAuth2 token provider
pub mod bigquery;

/// Inference backend client for chat and knowledge forwarding
pub mod inference;
