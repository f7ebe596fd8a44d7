//! Structured letter payload
//!
//! The numbering subsystem treats content as opaque apart from the three
//! fields every letter must carry before it can be finalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::DomainError;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Letter content as composed by the author
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
pub struct LetterContent {
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(custom(function = "not_blank"))]
    pub recipient: String,
    #[validate(custom(function = "not_blank"))]
    pub body: String,
    /// Template the letter was started from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Template-specific fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LetterContent {
    pub fn new(
        subject: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            recipient: recipient.into(),
            body: body.into(),
            template_id: None,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Names of required fields that are blank, in declaration order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let Err(errors) = self.validate() else {
            return Vec::new();
        };
        let invalid = errors.field_errors();
        ["subject", "recipient", "body"]
            .into_iter()
            .filter(|field| invalid.contains_key(*field))
            .collect()
    }

    /// Check that the letter can be finalized
    pub fn ensure_complete(&self) -> Result<(), DomainError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
