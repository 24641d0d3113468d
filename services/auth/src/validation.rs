//! Input validation utilities

/// Longest username accepted by the login form
pub const MAX_USERNAME_LEN: usize = 64;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username must be at most {} characters long",
            MAX_USERNAME_LEN
        ));
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    Ok(())
}

/// Validate a login form submission
pub fn validate_credentials(username: &str, password: &str) -> Result<(), String> {
    validate_username(username)?;
    validate_password(password)
}
