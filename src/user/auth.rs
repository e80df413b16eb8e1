//! Credential hashing
//!
//! Credentials are never stored in a recoverable form: the store keeps a salt,
//! the argon2 PHC string and the name of the hasher that produced it.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

mod portal_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    pub fn generate_b64_salt() -> String {
        SaltString::generate(&mut OsRng).to_string()
    }

    pub fn hash<T: AsRef<str>>(plain: &[u8], b64_salt: T) -> Result<String> {
        let salt = SaltString::from_b64(b64_salt.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string())
    }

    /// Errors only when `target_hash` is not a valid PHC string.
    pub fn verify<T: AsRef<str>>(plain: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain, &password_hash)
            .is_ok())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum PortalHasher {
    Argon2,
}

impl FromStr for PortalHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PortalHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for PortalHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl PortalHasher {
    pub fn generate_b64_salt(&self) -> String {
        match self {
            PortalHasher::Argon2 => portal_argon2::generate_b64_salt(),
        }
    }

    pub fn hash<T: AsRef<str>>(&self, plain: &[u8], b64_salt: T) -> Result<String> {
        match self {
            PortalHasher::Argon2 => portal_argon2::hash(plain, b64_salt),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain: T, target_hash: T) -> Result<bool> {
        match self {
            PortalHasher::Argon2 => portal_argon2::verify(plain.as_ref().as_bytes(), target_hash),
        }
    }
}

/// The stored form of a user's secret.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub salt: String,
    pub hash: String,
    pub hasher: PortalHasher,
}

impl StoredCredential {
    /// Salts and hashes `plain` with the default hasher.
    pub fn from_plain(plain: &str) -> Result<Self> {
        let hasher = PortalHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        let hash = hasher.hash(plain.as_bytes(), &salt)?;
        Ok(StoredCredential { salt, hash, hasher })
    }

    pub fn verify(&self, plain: &str) -> Result<bool> {
        self.hasher.verify(plain, self.hash.as_str())
    }
}

// Hashes stay out of logs.
impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash_is_deterministic_for_a_salt() {
        let b64_salt = PortalHasher::Argon2.generate_b64_salt();

        let hash1 = PortalHasher::Argon2
            .hash("123mypw".as_bytes(), &b64_salt)
            .unwrap();
        let hash2 = PortalHasher::Argon2.hash(b"123mypw", &b64_salt).unwrap();
        assert_eq!(hash1, hash2);
        assert!(!hash1.contains("123mypw"));

        assert!(PortalHasher::Argon2.verify("123mypw", &hash1).unwrap());
        assert!(!PortalHasher::Argon2.verify("not the pw", &hash1).unwrap());
    }

    #[test]
    fn stored_credential_verifies_only_the_exact_secret() {
        let credential = StoredCredential::from_plain("secret").unwrap();

        assert!(credential.verify("secret").unwrap());
        assert!(!credential.verify("Secret").unwrap());
        assert!(!credential.verify("secret ").unwrap());
        assert!(!credential.verify("").unwrap());
    }

    #[test]
    fn two_credentials_for_the_same_secret_use_different_salts() {
        let a = StoredCredential::from_plain("secret").unwrap();
        let b = StoredCredential::from_plain("secret").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let credential = StoredCredential {
            salt: "x".to_string(),
            hash: "plaintext-secret".to_string(),
            hasher: PortalHasher::Argon2,
        };
        assert!(credential.verify("plaintext-secret").is_err());
    }

    #[test]
    fn hasher_name_round_trips_through_strings() {
        assert_eq!(
            PortalHasher::from_str(&PortalHasher::Argon2.to_string()).unwrap(),
            PortalHasher::Argon2
        );
        assert!(PortalHasher::from_str("md5").is_err());
    }
}
