//! Route key construction.
//!
//! Every registry key is derived here so that registration and resolution
//! always agree on the exact string form.

/// Route used for utterances that carry no user.
pub const ONBOARD_ROUTE: &str = "onboard";

/// Separator between a token and an embedded literal value, e.g. `remind'at 5pm`.
pub const LITERAL_DELIMITER: char = '\'';

/// Drop an embedded literal suffix from a token.
pub fn strip_literal(token: &str) -> &str {
    token
        .split(LITERAL_DELIMITER)
        .next()
        .unwrap_or(token)
}

/// Strip the literal suffix and lowercase, giving a bare route key.
pub fn normalize_token(token: &str) -> String {
    strip_literal(token).to_lowercase()
}

/// Compound `command_object` key.
pub fn route_key(command: &str, object: &str) -> String {
    format!("{}_{}", normalize_token(command), normalize_token(object))
}
