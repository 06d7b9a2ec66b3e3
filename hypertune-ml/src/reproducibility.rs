//! Reproducibility: environment snapshots and result fingerprints.

use crate::error::MlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where and when a run happened. Never part of a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub crate_version: String,
    pub system_info: String,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
    /// Hash of the `HYPERTUNE_*` environment variables in effect.
    pub env_vars_hash: String,
}

impl EnvironmentSnapshot {
    pub fn capture() -> Self {
        Self {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            system_info: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            platform: std::env::consts::OS.to_string(),
            timestamp: Utc::now(),
            env_vars_hash: Self::compute_env_vars_hash(),
        }
    }

    fn compute_env_vars_hash() -> String {
        let mut vars: Vec<(String, String)> = std::env::vars()
            .filter(|(k, _)| k.starts_with("HYPERTUNE_"))
            .collect();
        vars.sort();
        let mut hasher = Sha256::new();
        for (key, value) in &vars {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// SHA-256 of the JSON encoding of `value`, as lowercase hex.
///
/// Maps must be ordered (`BTreeMap`) for the digest to be stable.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, MlError> {
    let bytes = serde_json::to_vec(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_capture() {
        let env = EnvironmentSnapshot::capture();
        assert_eq!(env.crate_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(env.platform, std::env::consts::OS);
        assert_eq!(env.env_vars_hash.len(), 64);
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let mut a = BTreeMap::new();
        a.insert("score", 0.95);
        a.insert("c", 1.0);
        let first = fingerprint(&a).unwrap();
        assert_eq!(first, fingerprint(&a.clone()).unwrap());
        assert_eq!(first.len(), 64);

        a.insert("score", 0.96);
        assert_ne!(first, fingerprint(&a).unwrap());
    }
}
