/// Credential hashing for account passwords
///
/// Passwords are stored as Argon2id PHC strings (64 MB memory, 3 passes,
/// 4 lanes, 32-byte output, random 16-byte salt).
///
/// # Example
///
/// ```
/// use custodian_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Sup3r$ecret")?;
/// assert!(verify_password("Sup3r$ecret", &hash)?);
/// assert!(!verify_password("wrong", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are rejected or
/// hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// # Returns
///
/// `Ok(false)` for a wrong password
///
/// # Errors
///
/// Returns an error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Checks minimum password requirements
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit and a special character.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return Err("Password must contain at least one digit".to_string());
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_uses_argon2id_parameters() {
        let hash = hash_password("Sup3r$ecret").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_salts_differ() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("MyP@ssw0rd!").is_ok());

        assert!(validate_password_strength("Sh0rt!")
            .unwrap_err()
            .contains("at least 8 characters"));
        assert!(validate_password_strength("lowercase1!")
            .unwrap_err()
            .contains("uppercase letter"));
        assert!(validate_password_strength("UPPERCASE1!")
            .unwrap_err()
            .contains("lowercase letter"));
        assert!(validate_password_strength("NoDigits!")
            .unwrap_err()
            .contains("digit"));
        assert!(validate_password_strength("NoSpecial123")
            .unwrap_err()
            .contains("special character"));
    }
}
