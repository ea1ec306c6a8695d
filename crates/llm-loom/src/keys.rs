//! API-key resolution from the environment.
//!
//! The engine itself only ever receives a key through
//! [`ChatContext::set_api_key`](crate::context::ChatContext::set_api_key);
//! where that key comes from is an application concern. This module
//! implements the conventional lookup: a provider-specific environment
//! variable first, then a `KEY=VALUE` line in `$HOME/.hynirc`.

use std::collections::HashMap;
use std::path::Path;

/// Conventional environment variable for a provider name.
///
/// Unknown providers map to `<NAME>_API_KEY` (uppercased).
pub fn env_var_for(provider: &str) -> String {
    match provider {
        "openai" => "OA_API_KEY".into(),
        "claude" => "CL_API_KEY".into(),
        "deepseek" => "DS_API_KEY".into(),
        "mistral" => "MS_API_KEY".into(),
        other => format!("{}_API_KEY", other.to_uppercase()),
    }
}

/// Resolves the API key for `provider`: environment variable first,
/// then the rc file in the user's home directory.
pub fn api_key_for(provider: &str) -> Option<String> {
    let var = env_var_for(provider);
    if let Ok(key) = std::env::var(&var) {
        if !key.is_empty() {
            return Some(key);
        }
    }

    let home = std::env::var("HOME").ok()?;
    let rc = Path::new(&home).join(".hynirc");
    parse_rc_file(&rc).remove(&var)
}

/// Parses a `KEY=VALUE` rc file, one entry per line, whitespace
/// trimmed. Lines without `=` are ignored.
pub fn parse_rc_file(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_var_for_known_providers() {
        assert_eq!(env_var_for("openai"), "OA_API_KEY");
        assert_eq!(env_var_for("claude"), "CL_API_KEY");
        assert_eq!(env_var_for("deepseek"), "DS_API_KEY");
        assert_eq!(env_var_for("mistral"), "MS_API_KEY");
    }

    #[test]
    fn test_env_var_for_unknown_provider() {
        assert_eq!(env_var_for("groq"), "GROQ_API_KEY");
    }

    #[test]
    fn test_parse_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".hynirc");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "CL_API_KEY = sk-ant-abc").unwrap();
        writeln!(file, "OA_API_KEY=sk-oa-xyz").unwrap();
        writeln!(file, "this line has no equals sign").unwrap();
        writeln!(file, "= dangling").unwrap();

        let parsed = parse_rc_file(&path);
        assert_eq!(parsed.get("CL_API_KEY").map(String::as_str), Some("sk-ant-abc"));
        assert_eq!(parsed.get("OA_API_KEY").map(String::as_str), Some("sk-oa-xyz"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_rc_file_missing() {
        assert!(parse_rc_file(Path::new("/definitely/not/here/.hynirc")).is_empty());
    }
}
