use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordConfig;

/// Argon2id hasher with a fixed cost. Cheap to clone, so it can be moved into
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self, String> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None)
            .map_err(|e| format!("Invalid Argon2 params: {e}"))?;
        Ok(Self { params })
    }

    /// Hash a password into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| format!("Hashing failed: {e}"))
    }
}

/// Verify a password against a PHC hash. Cost parameters are read from the
/// hash itself.
pub fn verify(password: &str, hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Invalid hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_round_trips_through_verify() {
        let hash = cheap().hash("securepassword123").unwrap();
        assert_ne!(hash, "securepassword123");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify("securepassword123", &hash).unwrap());
        assert!(!verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn rejects_unusable_params() {
        let result = PasswordHasher::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
        });
        assert!(result.is_err());
    }
}
