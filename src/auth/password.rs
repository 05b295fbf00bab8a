use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::error;

use crate::error::AppError;

/// One-way password hashing with a process-wide work factor.
///
/// The work factor only affects newly produced hashes; verification reads
/// the parameters embedded in the stored PHC string, so raising it never
/// invalidates existing hashes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(work_factor: u32) -> anyhow::Result<Self> {
        let params = Params::new(Params::DEFAULT_M_COST, work_factor, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::HashingFailed
            })?
            .to_string();
        Ok(hash)
    }

    /// Uniformly returns `InvalidCredential` for a wrong password and for a
    /// malformed stored hash; callers cannot tell which it was.
    pub fn verify(&self, stored_hash: &str, plain: &str) -> Result<(), AppError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AppError::InvalidCredential
        })?;
        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .map_err(|_| AppError::InvalidCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(1).expect("params should be valid")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let h = hasher();
        let hash = h.hash("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(h.verify(&hash, "Secur3P@ssw0rd!").is_ok());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let h = hasher();
        let hash = h.hash("correct-horse-battery-staple").expect("hashing should succeed");
        let err = h.verify(&hash, "wrong-password").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential));
    }

    #[test]
    fn same_password_hashes_differently_but_both_verify() {
        let h = hasher();
        let a = h.hash("secret").unwrap();
        let b = h.hash("secret").unwrap();
        assert_ne!(a, b);
        assert!(h.verify(&a, "secret").is_ok());
        assert!(h.verify(&b, "secret").is_ok());
    }

    #[test]
    fn malformed_hash_is_indistinguishable_from_wrong_password() {
        let err = hasher().verify("not-a-valid-hash", "anything").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredential));
    }

    #[test]
    fn higher_work_factor_still_verifies_old_hashes() {
        let old = hasher().hash("secret").unwrap();
        let upgraded = CredentialHasher::new(3).unwrap();
        assert!(upgraded.verify(&old, "secret").is_ok());
    }
}
