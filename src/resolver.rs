// ABOUTME: Domain-to-tenant resolution over the chat profile store
// ABOUTME: Two-tier lookup with ownership-scoped variants and id/domain alias handling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

//! Domain resolution
//!
//! Maps an arbitrary target string (URL, `Origin` header, bare domain, or
//! chat alias) to a chat profile. Resolution is a two-tier search: the
//! explicit target table first, then the legacy single-value column. A miss
//! is an absent value, never an error; only storage faults propagate.
//!
//! The ownership-scoped variants enforce tenant isolation: a target owned
//! by another operator resolves to `None` for the caller even though it
//! exists globally.

use crate::database::ChatProfilesManager;
use crate::domain::{normalize_domain, sanitize_chat_id};
use crate::errors::AppResult;
use crate::models::ChatProfile;

/// Stateless resolver; every call re-reads from the backing store
pub struct DomainResolver {
    chats: ChatProfilesManager,
}

impl DomainResolver {
    /// Create a resolver over the profile store
    #[must_use]
    pub const fn new(chats: ChatProfilesManager) -> Self {
        Self { chats }
    }

    /// Resolve a raw target string to a chat profile.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage faults; a miss is `Ok(None)`.
    pub async fn resolve_profile(&self, target: &str) -> AppResult<Option<ChatProfile>> {
        let normalized = normalize_domain(target);
        if normalized.is_empty() {
            return Ok(None);
        }
        if let Some(profile) = self.chats.get_by_target(&normalized).await? {
            return Ok(Some(profile));
        }
        self.chats.get_by_legacy_target(&normalized).await
    }

    /// Resolve a raw target string, visible only within one owner's tenancy.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage faults; a miss is `Ok(None)`.
    pub async fn resolve_profile_for_owner(
        &self,
        target: &str,
        owner_user_id: &str,
    ) -> AppResult<Option<ChatProfile>> {
        let normalized = normalize_domain(target);
        if normalized.is_empty() {
            return Ok(None);
        }
        if let Some(profile) = self
            .chats
            .get_by_target_owned(&normalized, owner_user_id)
            .await?
        {
            return Ok(Some(profile));
        }
        self.chats
            .get_by_legacy_target_owned(&normalized, owner_user_id)
            .await
    }

    /// Resolve a key that may be either a chat alias or a domain-like
    /// string. The exact id match wins; domain resolution is the fallback.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage faults; a miss is `Ok(None)`.
    pub async fn resolve_chat(&self, key: &str) -> AppResult<Option<ChatProfile>> {
        let sanitized = sanitize_chat_id(key);
        if !sanitized.is_empty() {
            if let Some(profile) = self.chats.get(&sanitized).await? {
                return Ok(Some(profile));
            }
        }
        self.resolve_profile(key).await
    }

    /// Dual-mode resolution scoped to one owner's tenancy.
    ///
    /// # Errors
    ///
    /// Returns an error only on storage faults; a miss is `Ok(None)`.
    pub async fn resolve_chat_for_owner(
        &self,
        key: &str,
        owner_user_id: &str,
    ) -> AppResult<Option<ChatProfile>> {
        let sanitized = sanitize_chat_id(key);
        if !sanitized.is_empty() {
            if let Some(profile) = self.chats.get_owned(&sanitized, owner_user_id).await? {
                return Ok(Some(profile));
            }
        }
        self.resolve_profile_for_owner(key, owner_user_id).await
    }
}
