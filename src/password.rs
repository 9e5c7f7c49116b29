//! Password hashing and verification with bcrypt.

/// Work factor of newly hashed passwords.
pub const COST: u32 = 10;

/// The outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The password matches the hash.
    Success,
    /// The password does not match the hash.
    Mismatch,
    /// The stored value is not a bcrypt hash.
    MalformedHash,
}

impl Verification {
    /// Callers must not tell a mismatch from a malformed hash apart, so both are a failure.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Check `password` against the stored `hashword`. Deliberately slow.
pub fn verify(hashword: &str, password: &str) -> Verification {
    match bcrypt::verify(password, hashword) {
        Ok(true) => Verification::Success,
        Ok(false) => Verification::Mismatch,
        Err(_) => Verification::MalformedHash,
    }
}

/// Hash `password` with a fresh salt.
pub fn hash(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, COST)
}
