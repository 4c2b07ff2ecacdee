// zkam/zkam-common/src/config.rs

//! Deployment profile: the tree depth and mapper scheme a deployment commits to.

use std::{env, fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    commitment::AttestationScheme,
    merkle::MAX_TREE_DEPTH,
    schema::{SignalSchema, SCHEMA_VERSION},
};

pub const PROFILE_PATH_ENV: &str = "ZKAM_PROFILE_PATH";
pub const TREE_DEPTH_ENV: &str = "ZKAM_TREE_DEPTH";
pub const PROVING_TIMEOUT_ENV: &str = "ZKAM_PROVING_TIMEOUT_SECS";

/// One day. Longer jobs belong to a scheduler, not to a single attempt.
pub const MAX_PROVING_TIMEOUT_SECS: u64 = 86_400;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,

    /// Depth `D` of the accounts tree; every path carries exactly `D` levels.
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,

    #[serde(default)]
    pub attestation_scheme: AttestationScheme,

    /// Receipt width `R`; must agree with the scheme.
    #[serde(default = "default_receipt_len")]
    pub receipt_len: usize,

    /// Mapper public key width `K`; must agree with the scheme.
    #[serde(default = "default_pubkey_len")]
    pub pubkey_len: usize,

    #[serde(default = "default_proving_timeout_secs")]
    pub proving_timeout_secs: u64,
}

fn default_schema_version() -> u16 {
    SCHEMA_VERSION
}

fn default_tree_depth() -> usize {
    20
}

fn default_receipt_len() -> usize {
    AttestationScheme::Secp256k1Ecdsa.receipt_len()
}

fn default_pubkey_len() -> usize {
    AttestationScheme::Secp256k1Ecdsa.pubkey_len()
}

fn default_proving_timeout_secs() -> u64 {
    300
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            tree_depth: default_tree_depth(),
            attestation_scheme: AttestationScheme::default(),
            receipt_len: default_receipt_len(),
            pubkey_len: default_pubkey_len(),
            proving_timeout_secs: default_proving_timeout_secs(),
        }
    }
}

impl DeploymentProfile {
    /// Default profile at a different tree depth.
    pub fn with_depth(tree_depth: usize) -> Self {
        Self {
            tree_depth,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        let profile: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse profile {}", path.display()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load from `ZKAM_PROFILE_PATH` if set, else defaults, then apply the
    /// depth and timeout overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut profile = match lookup(PROFILE_PATH_ENV) {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };

        if let Some(raw) = lookup(TREE_DEPTH_ENV) {
            profile.tree_depth = raw
                .trim()
                .parse()
                .with_context(|| format!("{TREE_DEPTH_ENV} must be an integer"))?;
        }
        if let Some(raw) = lookup(PROVING_TIMEOUT_ENV) {
            profile.proving_timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{PROVING_TIMEOUT_ENV} must be an integer"))?;
        }

        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.schema_version == SCHEMA_VERSION,
            "unsupported schema version {} (expected {SCHEMA_VERSION})",
            self.schema_version
        );
        ensure!(
            (1..=MAX_TREE_DEPTH).contains(&self.tree_depth),
            "tree depth {} outside 1..={MAX_TREE_DEPTH}",
            self.tree_depth
        );
        ensure!(
            self.receipt_len == self.attestation_scheme.receipt_len(),
            "receipt length {} does not match {} (expects {})",
            self.receipt_len,
            self.attestation_scheme,
            self.attestation_scheme.receipt_len()
        );
        ensure!(
            self.pubkey_len == self.attestation_scheme.pubkey_len(),
            "public key length {} does not match {} (expects {})",
            self.pubkey_len,
            self.attestation_scheme,
            self.attestation_scheme.pubkey_len()
        );
        ensure!(
            (1..=MAX_PROVING_TIMEOUT_SECS).contains(&self.proving_timeout_secs),
            "proving timeout {}s outside 1..={MAX_PROVING_TIMEOUT_SECS}",
            self.proving_timeout_secs
        );
        Ok(())
    }

    pub fn proving_timeout(&self) -> Duration {
        Duration::from_secs(self.proving_timeout_secs)
    }

    pub fn schema(&self) -> SignalSchema {
        SignalSchema::new(self.tree_depth, self.receipt_len, self.pubkey_len)
    }
}
