//! Config-backed branch directory

use std::collections::HashMap;

use application::{error::ApplicationError, ports::BranchDirectoryPort};
use async_trait::async_trait;
use domain::{BranchCode, BranchId};
use tracing::debug;

use crate::config::BranchEntry;

/// Branch directory built from the `[[branches]]` config table
#[derive(Debug, Clone, Default)]
pub struct ConfigBranchDirectory {
    codes: HashMap<String, BranchCode>,
}

impl ConfigBranchDirectory {
    /// Build the directory, rejecting malformed codes and duplicate ids
    pub fn from_entries(entries: &[BranchEntry]) -> Result<Self, ApplicationError> {
        let mut codes = HashMap::with_capacity(entries.len());
        for entry in entries {
            let id = BranchId::new(entry.id.as_str())
                .map_err(|e| ApplicationError::Configuration(format!("branch id: {e}")))?;
            let code = BranchCode::new(entry.code.as_str()).map_err(|e| {
                ApplicationError::Configuration(format!("branch {id}: {e}"))
            })?;
            if codes.insert(id.as_str().to_string(), code).is_some() {
                return Err(ApplicationError::Configuration(format!(
                    "branch {id} is listed twice"
                )));
            }
        }
        debug!(count = codes.len(), "Loaded branch directory");
        Ok(Self { codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl BranchDirectoryPort for ConfigBranchDirectory {
    async fn lookup(&self, branch_id: &BranchId) -> Result<BranchCode, ApplicationError> {
        self.codes
            .get(branch_id.as_str())
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound(format!("Unknown branch {branch_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, code: &str) -> BranchEntry {
        BranchEntry {
            id: id.into(),
            code: code.into(),
        }
    }

    #[tokio::test]
    async fn resolves_configured_branches() {
        let directory =
            ConfigBranchDirectory::from_entries(&[entry("riyadh", "ry"), entry("jeddah", "JD")])
                .unwrap();

        let code = directory.lookup(&BranchId::new("riyadh").unwrap()).await.unwrap();
        assert_eq!(code.as_str(), "RY");
        assert_eq!(directory.len(), 2);
    }

    #[tokio::test]
    async fn unknown_branch_is_not_found() {
        let directory = ConfigBranchDirectory::from_entries(&[entry("riyadh", "RY")]).unwrap();
        let err = directory
            .lookup(&BranchId::new("dammam").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[test]
    fn malformed_code_is_a_configuration_error() {
        let err = ConfigBranchDirectory::from_entries(&[entry("riyadh", "R-Y")]).unwrap_err();
        assert!(matches!(err, ApplicationError::Configuration(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ConfigBranchDirectory::from_entries(&[entry("riyadh", "RY"), entry("riyadh", "RD")])
            .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }
}
