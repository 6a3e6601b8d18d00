//! Policy document loader.
//!
//! Loads the five YAML documents for a domain from
//! `<base>/<domain>/{policy,categories,decisions,actions,risk_rules}.yaml`.
//! Read-only: the loader never writes, and the raw set it returns is only
//! ever consumed by the compiler.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::PolicyError;
use crate::policy::model::{
    ActionsDoc, CategoriesDoc, DecisionsDoc, PolicyMetaDoc, RawPolicySet, RiskRulesDoc,
};

/// Loads raw policy document sets from disk.
pub struct PolicyLoader {
    base_path: PathBuf,
}

impl PolicyLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Load all five documents for `domain`.
    pub fn load_domain(&self, domain: &str) -> Result<RawPolicySet, PolicyError> {
        let domain_path = self.base_path.join(domain);
        if !domain_path.is_dir() {
            return Err(PolicyError::DomainNotFound {
                domain: domain.to_string(),
                path: self.base_path.display().to_string(),
            });
        }

        let set = RawPolicySet {
            policy: self.load_doc::<PolicyMetaDoc>(&domain_path, domain, "policy.yaml")?,
            categories: self.load_doc::<CategoriesDoc>(&domain_path, domain, "categories.yaml")?,
            decisions: self.load_doc::<DecisionsDoc>(&domain_path, domain, "decisions.yaml")?,
            actions: self.load_doc::<ActionsDoc>(&domain_path, domain, "actions.yaml")?,
            risk_rules: self.load_doc::<RiskRulesDoc>(&domain_path, domain, "risk_rules.yaml")?,
        };

        debug!(
            domain = %domain,
            categories = set.categories.categories.len(),
            decisions = set.decisions.decisions.len(),
            actions = set.actions.actions.len(),
            "Loaded policy document set"
        );
        Ok(set)
    }

    fn load_doc<T: DeserializeOwned>(
        &self,
        domain_path: &Path,
        domain: &str,
        document: &str,
    ) -> Result<T, PolicyError> {
        let path = domain_path.join(document);
        let raw = std::fs::read_to_string(&path).map_err(|_| PolicyError::MissingDocument {
            domain: domain.to_string(),
            document: document.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| PolicyError::Parse {
            document: document.to_string(),
            message: e.to_string(),
        })
    }
}
