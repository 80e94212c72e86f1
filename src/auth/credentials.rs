use crate::error::AppError;

/// Credential checking behind a seam so the storage contract never depends
/// on a particular hash scheme. The login and admin-gate paths only see
/// hash/verify.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn hash(&self, password: &str) -> Result<String, AppError>;

    fn verify(&self, password: &str, stored: &str) -> Result<bool, AppError>;
}

/// Production implementation: bcrypt with the library's default cost.
pub struct BcryptVerifier;

impl CredentialVerifier for BcryptVerifier {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
    }

    fn verify(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        // An unparseable stored hash reads as a failed match, not a 500
        match bcrypt::verify(password, stored) {
            Ok(valid) => Ok(valid),
            Err(_) => Ok(false),
        }
    }
}
