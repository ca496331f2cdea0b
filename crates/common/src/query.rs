//! Inbound query context.

use serde::{Deserialize, Serialize};

/// How strictly compliance annotations should be enforced for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    #[default]
    Standard,
    Strict,
}

/// Request context passed alongside the raw query text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default)]
    pub compliance_level: ComplianceLevel,
}

impl QueryContext {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_compliance_level(mut self, level: ComplianceLevel) -> Self {
        self.compliance_level = level;
        self
    }
}
