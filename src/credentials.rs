//! # Credential Generation
//!
//! Per-tenant secrets for the database and object-store accounts.
//!
//! Secrets are generated exactly once, at tenant creation, from the OS
//! CSPRNG and are never rotated by this service. The core does not redact
//! or encrypt them; encryption at rest is the store collaborator's concern.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Generated secrets for one tenant stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredentials {
    /// Postgres account password (32 hex characters)
    pub postgres_password: String,
    /// MinIO root access key (32 hex characters)
    pub minio_access_key: String,
    /// MinIO root secret key (64 hex characters)
    pub minio_secret_key: String,
}

impl TenantCredentials {
    /// Generate a fresh credential set from the OS CSPRNG
    pub fn generate() -> Self {
        Self {
            postgres_password: random_hex(16),
            minio_access_key: random_hex(16),
            minio_secret_key: random_hex(32),
        }
    }
}

/// Hex-encode `len` bytes of OS randomness (output is `2 * len` characters)
fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_lengths_match_contract() {
        let creds = TenantCredentials::generate();
        assert_eq!(creds.postgres_password.len(), 32);
        assert_eq!(creds.minio_access_key.len(), 32);
        assert_eq!(creds.minio_secret_key.len(), 64);
    }

    #[test]
    fn generated_values_are_hex() {
        let creds = TenantCredentials::generate();
        for value in [
            &creds.postgres_password,
            &creds.minio_access_key,
            &creds.minio_secret_key,
        ] {
            assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn no_collisions_over_many_trials() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let creds = TenantCredentials::generate();
            assert!(seen.insert(creds.postgres_password));
            assert!(seen.insert(creds.minio_secret_key));
        }
    }
}
