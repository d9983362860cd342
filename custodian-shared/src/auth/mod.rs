/// Credential and role helpers
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`authorization`]: Administrator / self / project-creator checks

pub mod authorization;
pub mod password;
