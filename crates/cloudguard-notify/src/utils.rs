//! Helpers shared by the webhook channel and the autoscaler client.

use serde_json::{Map, Value};

/// Cap applied to remote response bodies before they land in an error.
pub const MAX_BODY_LENGTH: usize = 4000;

const SECRET_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "credentials",
    "authorization",
];

/// Cuts `s` to at most `max_len` bytes, backing off to a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_owned();
    }
    let cut = (0..=max_len).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0);
    format!("{}... [truncated]", &s[..cut])
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEY_FRAGMENTS.iter().any(|frag| key.contains(frag))
}

/// Copy of `value` where every object field whose name looks like a
/// credential is replaced by `"***"`, at any depth.
pub fn redact_sensitive_json(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, inner)| {
                    let masked = if is_secret_key(key) {
                        Value::from("***")
                    } else {
                        redact_sensitive_json(inner)
                    };
                    (key.clone(), masked)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => items.iter().map(redact_sensitive_json).collect(),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncate_string("503 upstream", 64), "503 upstream");
    }

    #[test]
    fn long_bodies_are_cut_on_a_char_boundary() {
        assert_eq!(truncate_string("upstream error", 8), "upstream... [truncated]");
        // "é" is two bytes wide
        assert_eq!(truncate_string("éa", 1), "... [truncated]");
    }

    #[test]
    fn credentials_are_masked_at_any_depth() {
        let settings = json!({
            "urls": ["https://hooks.example.com/cloudguard"],
            "Authorization": "Bearer abc",
            "headers": [{ "x_api_key": "k1", "accept": "application/json" }],
            "auth": { "client_secret": "xyz789", "realm": "ops" }
        });

        let redacted = redact_sensitive_json(&settings);
        assert_eq!(redacted["urls"][0], "https://hooks.example.com/cloudguard");
        assert_eq!(redacted["Authorization"], "***");
        assert_eq!(redacted["headers"][0]["x_api_key"], "***");
        assert_eq!(redacted["headers"][0]["accept"], "application/json");
        assert_eq!(redacted["auth"]["client_secret"], "***");
        assert_eq!(redacted["auth"]["realm"], "ops");
    }
}
