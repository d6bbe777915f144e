//! Device fingerprint used as the advisory quota key
//!
//! Derived once from stable characteristics of the environment, then stored
//! so later runs reuse the same identifier.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Hex characters kept from the digest
const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Read the stored fingerprint, creating and storing one if absent
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if let Ok(stored) = fs::read_to_string(path) {
            let stored = stored.trim();
            if !stored.is_empty() {
                debug!("Using stored device fingerprint from {}", path.display());
                return Ok(Self(stored.to_string()));
            }
        }

        let fingerprint = Self::derive(&environment_traits());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &fingerprint.0)?;
        debug!("Stored new device fingerprint at {}", path.display());
        Ok(fingerprint)
    }

    /// Hash an ordered list of traits into a fingerprint
    pub fn derive(traits: &[String]) -> Self {
        let mut hasher = Sha256::new();
        for value in traits {
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
        Self(hex[..FINGERPRINT_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characteristics that stay put across runs on the same machine
fn environment_traits() -> Vec<String> {
    let var = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| env::var(name).ok())
            .unwrap_or_default()
    };

    vec![
        env::consts::OS.to_string(),
        env::consts::ARCH.to_string(),
        var(&["HOSTNAME", "COMPUTERNAME"]),
        var(&["USER", "USERNAME"]),
        dirs::home_dir()
            .map(|home| home.display().to_string())
            .unwrap_or_default(),
    ]
}
