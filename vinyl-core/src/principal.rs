//! Identity types carried with every storage operation.

use std::collections::BTreeSet;

/// Stable identifier of an authenticated subject (the token's `sub`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An authenticated caller. Built only by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Principal {
    pub subject_id: SubjectId,
    pub display_label: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject_id: impl Into<SubjectId>, display_label: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_label: display_label.into(),
            roles: BTreeSet::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Per-request context passed explicitly down the call chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            principal: None,
            request_id: None,
        }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn subject(&self) -> Option<&SubjectId> {
        self.principal.as_ref().map(|p| &p.subject_id)
    }
}
