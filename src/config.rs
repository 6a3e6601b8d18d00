//! Configuration types.

use std::path::PathBuf;

/// Triage engine configuration.
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Directory containing per-domain policy document sets.
    pub policies_dir: PathBuf,
    /// Default policy domain for inbound email.
    pub default_domain: String,
    /// Minimum trimmed length for a candidate's reasoning summary.
    pub min_reasoning_len: usize,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            policies_dir: PathBuf::from("policies"),
            default_domain: "founder_inbox".to_string(),
            min_reasoning_len: 20,
        }
    }
}

impl WardenConfig {
    /// Build a config from environment variables, falling back to defaults.
    ///
    /// - `WARDEN_POLICY_DIR` — policy document root
    /// - `WARDEN_DOMAIN` — default domain
    /// - `WARDEN_MIN_REASONING` — minimum reasoning-summary length
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("WARDEN_POLICY_DIR") {
            config.policies_dir = PathBuf::from(dir);
        }
        if let Ok(domain) = std::env::var("WARDEN_DOMAIN") {
            config.default_domain = domain;
        }
        if let Ok(len) = std::env::var("WARDEN_MIN_REASONING")
            && let Ok(len) = len.parse()
        {
            config.min_reasoning_len = len;
        }
        config
    }
}
