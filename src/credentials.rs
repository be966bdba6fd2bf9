//! Password hashing with Argon2id.

use argon2::{
    Argon2,
    password_hash::{
        Error,
        PasswordHash,
        PasswordHasher,
        PasswordVerifier,
        SaltString,
        rand_core::OsRng,
    },
};

/// Hash `pw` with a fresh random salt.
///
/// # Errors
/// Returns any error reported by the Argon2 hasher.
pub fn hash_password(argon2: &Argon2, pw: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
}

/// Check `pw` against a stored PHC hash string.
///
/// Hashes that fail to parse never verify. Cost parameters are read from the
/// stored hash, so accounts created under older settings keep working.
#[must_use]
pub fn verify_password(argon2: &Argon2, hash: &str, pw: &str) -> bool {
    PasswordHash::new(hash)
        .is_ok_and(|parsed| argon2.verify_password(pw.as_bytes(), &parsed).is_ok())
}
