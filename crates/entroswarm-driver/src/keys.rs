//! Physical key pool

use std::path::Path;

use entroswarm_common::{PhysicalKey, Result};
use tracing::info;

/// Letters and digits, named the way the frontend's `key` command expects
/// and valued with their Windows virtual-key codes.
pub fn default_key_pool() -> Vec<PhysicalKey> {
    let letters = (b'a'..=b'z')
        .map(|c| PhysicalKey::new(c.to_ascii_uppercase() as u32, (c as char).to_string()));
    let digits = (b'0'..=b'9').map(|c| PhysicalKey::new(c as u32, (c as char).to_string()));
    letters.chain(digits).collect()
}

/// Parse a JSON array of `{ "value": <code>, "key": <name> }`
pub fn parse_key_pool(json: &str) -> Result<Vec<PhysicalKey>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_key_pool(path: &Path) -> Result<Vec<PhysicalKey>> {
    let json = std::fs::read_to_string(path)?;
    let pool = parse_key_pool(&json)?;
    info!(path = %path.display(), keys = pool.len(), "Loaded key pool");
    Ok(pool)
}

/// The configured pool, or the built-in one
pub fn resolve_key_pool(path: Option<&Path>) -> Result<Vec<PhysicalKey>> {
    match path {
        Some(path) => load_key_pool(path),
        None => Ok(default_key_pool()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entroswarm_common::SwarmError;

    #[test]
    fn test_default_pool() {
        let pool = default_key_pool();
        assert_eq!(pool.len(), 36);
        assert_eq!(pool[0], PhysicalKey::new(65, "a"));
        assert_eq!(pool[26], PhysicalKey::new(48, "0"));
    }

    #[test]
    fn test_parse_accepts_key_and_name_fields() {
        let pool = parse_key_pool(r#"[{"value": 90, "key": "z"}, {"value": 88, "name": "x"}]"#)
            .unwrap();
        assert_eq!(pool, vec![PhysicalKey::new(90, "z"), PhysicalKey::new(88, "x")]);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_key_pool(r#"[{"value": "ninety"}]"#).unwrap_err();
        assert!(matches!(err, SwarmError::Serialization(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = resolve_key_pool(Some(Path::new("/nonexistent/keys.json"))).unwrap_err();
        assert!(matches!(err, SwarmError::Io(_)));
    }
}
