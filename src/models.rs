// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Bundle Models
//!
//! The shape of the payload the upstream fetch orchestrator hands in for
//! storage: one bundle per consent, holding typed groups of documents
//! pulled from the source registries. The cache itself treats the
//! serialized bundle as an opaque blob; these types exist so callers on
//! both sides of the cache agree on the wire shape.
//!
//! Document contents stay `serde_json::Value` on purpose. Interpreting
//! them is upstream business logic, not a cache concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Document Kinds
// =============================================================================

/// Category of a fetched document group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Income tax filings and assessment records
    TaxFiling,
    /// Bank account statements
    BankStatement,
    /// Government identity records
    IdentityRecord,
    /// Credit bureau reports
    CreditReport,
    /// Anything the source registry returns outside the known categories
    Other,
}

// =============================================================================
// Bundle
// =============================================================================

/// One typed group of documents fetched from a single source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentGroup {
    /// Category of the documents in this group.
    pub kind: DocumentKind,
    /// When the group was fetched from the source registry (provenance).
    pub fetched_at: DateTime<Utc>,
    /// The documents themselves, opaque to the cache.
    pub documents: Vec<serde_json::Value>,
}

/// The full payload stored under one consent: every document group the
/// orchestrator fetched for that grant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentBundle {
    pub groups: Vec<DocumentGroup>,
}

impl DocumentBundle {
    /// Bundle with no groups yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group, builder style.
    pub fn with_group(mut self, group: DocumentGroup) -> Self {
        self.groups.push(group);
        self
    }
}
