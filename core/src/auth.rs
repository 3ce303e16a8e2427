use base64::Engine;

/// Build the value of an HTTP Basic `Authorization` header.
/// Format: `Basic ` + base64(`username:password`).
pub fn basic_authorization(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_authorization_encodes_user_and_password() {
        // "admin:admin" is the stock Cloudera Manager credential pair.
        assert_eq!(basic_authorization("admin", "admin"), "Basic YWRtaW46YWRtaW4=");
    }

    #[test]
    fn basic_authorization_keeps_colons_in_password() {
        let header = basic_authorization("ops", "a:b");
        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(decoded, b"ops:a:b");
    }
}
