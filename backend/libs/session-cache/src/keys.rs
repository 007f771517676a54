//! Key schema
//!
//! Keys are `<namespace>.<identifier>`, e.g. `register.alice@example.com` or
//! `revoked-token.<jti>`. Invalidation works on namespace prefixes.

/// Build a namespaced key
pub fn cache_key(namespace: &str, id: &str) -> String {
    format!("{}.{}", namespace, id)
}

/// Escape Redis glob metacharacters so a prefix matches literally
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
