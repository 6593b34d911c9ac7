use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PolicyError, PolicyResult};
use crate::types::{PolicyDocument, RequestAttributes};

/// Documents larger than this are refused before parsing.
const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Read a file as UTF-8 text.
pub fn read_raw(path: &Path) -> PolicyResult<String> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PolicyError::DocumentNotFound(path.to_path_buf()),
        _ => PolicyError::DocumentRead(format!("{}: {}", path.display(), e)),
    })?;
    if text.len() > MAX_DOCUMENT_BYTES {
        return Err(PolicyError::DocumentRead(format!(
            "{}: document exceeds 10MB size limit",
            path.display()
        )));
    }
    Ok(text)
}

fn parse<T: DeserializeOwned>(text: &str) -> PolicyResult<T> {
    if text.trim().is_empty() {
        return Err(PolicyError::DocumentParse("document is empty".to_string()));
    }
    serde_json::from_str(text).map_err(|e| PolicyError::DocumentParse(e.to_string()))
}

pub fn parse_policy(text: &str) -> PolicyResult<PolicyDocument> {
    parse(text)
}

pub fn parse_request(text: &str) -> PolicyResult<RequestAttributes> {
    parse(text)
}

pub fn read_policy(path: &Path) -> PolicyResult<PolicyDocument> {
    parse(&read_raw(path)?).map_err(|e| with_path(e, path))
}

pub fn read_request(path: &Path) -> PolicyResult<RequestAttributes> {
    parse(&read_raw(path)?).map_err(|e| with_path(e, path))
}

/// Pretty-printed JSON with absent fields omitted.
pub fn to_json<T: Serialize>(value: &T) -> PolicyResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| PolicyError::DocumentWrite(e.to_string()))
}

/// Write `policy` to `path`, creating parent directories as needed.
pub fn write_policy(policy: &PolicyDocument, path: &Path) -> PolicyResult<()> {
    let json = to_json(policy)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| PolicyError::DocumentWrite(format!("{}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, json)
        .map_err(|e| PolicyError::DocumentWrite(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "wrote policy document");
    Ok(())
}

fn with_path(err: PolicyError, path: &Path) -> PolicyError {
    match err {
        PolicyError::DocumentParse(msg) => {
            PolicyError::DocumentParse(format!("{}: {}", path.display(), msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeMatcher, DecisionRule, Effect, RecognizedAttribute};
    use std::path::PathBuf;

    fn make_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blindpdp-document-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn make_policy() -> PolicyDocument {
        PolicyDocument {
            name: Some("policy1".into()),
            version: 1,
            decision_rules: vec![DecisionRule {
                kind: None,
                effect: Effect::Permit,
                id: Some("r-1".into()),
                updated_at: Some("2021-03-02T10:00:00Z".into()),
                cnf_condition: vec![vec![AttributeMatcher::new(
                    "principal.microsoft.id",
                    "u-1",
                )]],
            }],
            ..PolicyDocument::default()
        }
    }

    #[test]
    fn test_write_then_read_policy() {
        let dir = make_dir("roundtrip");
        let path = dir.join("policy1.json");
        write_policy(&make_policy(), &path).unwrap();
        assert_eq!(read_policy(&path).unwrap(), make_policy());
        let raw = read_raw(&path).unwrap();
        assert!(raw.contains('\n'));
        assert!(!raw.contains("null"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = make_dir("missing").join("nope.json");
        match read_policy(&path) {
            Err(PolicyError::DocumentNotFound(p)) => assert_eq!(p, path),
            other => panic!("expected DocumentNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let dir = make_dir("badjson");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "{\"decisionRules\": [").unwrap();
        let err = read_policy(&path).unwrap_err();
        assert!(matches!(err, PolicyError::DocumentParse(_)));
        assert!(err.to_string().contains("broken.json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(
            parse_policy("  \n"),
            Err(PolicyError::DocumentParse(_))
        ));
    }

    #[test]
    fn test_parse_request() {
        let request = parse_request(
            r#"{"attributes":[{"attributeName":"resource.azure.path","attributeValueIncludes":"/a/b/c"}]}"#,
        )
        .unwrap();
        assert_eq!(request.get(RecognizedAttribute::ResourcePath), Some("/a/b/c"));
    }
}
