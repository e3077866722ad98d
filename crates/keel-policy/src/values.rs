//! External value resolution.
//!
//! Fetches a document named by a [`ValuesFrom`] descriptor and flattens the
//! values its expression addresses into a set of strings for membership
//! tests. Nothing is cached here; the selection context resolves each
//! descriptor once per pass and shares the result.

use crate::error::PolicyError;
use async_trait::async_trait;
use keel_core::{FieldPath, RemoteError, ValueSource, ValuesFormat, ValuesFrom};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resolves external value lists.
#[derive(Clone)]
pub struct ExternalValueResolver {
    source: Arc<dyn ValueSource>,
}

impl ExternalValueResolver {
    pub fn new(source: Arc<dyn ValueSource>) -> Self {
        Self { source }
    }

    /// Fetch and extract the value set described by `from`.
    pub async fn resolve(&self, from: &ValuesFrom) -> Result<BTreeSet<String>, PolicyError> {
        let body = self
            .source
            .fetch(&from.url)
            .await
            .map_err(|source| PolicyError::SourceUnreachable {
                url: from.url.clone(),
                source,
            })?;

        let values = extract_values(from, &body)?;
        tracing::debug!(url = %from.url, count = values.len(), "Resolved external values");
        Ok(values)
    }
}

/// Extract the value set from an already-fetched document body.
pub fn extract_values(from: &ValuesFrom, body: &str) -> Result<BTreeSet<String>, PolicyError> {
    let format = from.effective_format().ok_or_else(|| {
        PolicyError::extraction(&from.url, "cannot infer document format; set `format`")
    })?;

    let document: Value = match format {
        ValuesFormat::Txt => {
            return Ok(body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect());
        }
        ValuesFormat::Json => serde_json::from_str(body)
            .map_err(|e| PolicyError::extraction(&from.url, format!("invalid JSON: {}", e)))?,
        ValuesFormat::Yaml => serde_yaml::from_str(body)
            .map_err(|e| PolicyError::extraction(&from.url, format!("invalid YAML: {}", e)))?,
    };

    let mut values = BTreeSet::new();
    match &from.expr {
        None => match &document {
            Value::Object(map) => values.extend(map.keys().cloned()),
            other => flatten_into(&from.url, other, &mut values)?,
        },
        Some(expr) => {
            let path = FieldPath::parse(expr)
                .map_err(|e| PolicyError::extraction(&from.url, e.to_string()))?;
            let selected: Vec<&Value> = path
                .select(&document)
                .into_iter()
                .filter(|v| !v.is_null())
                .collect();
            if selected.is_empty() {
                return Err(PolicyError::extraction(
                    &from.url,
                    format!("expression '{}' addresses no values", expr),
                ));
            }
            for value in selected {
                flatten_into(&from.url, value, &mut values)?;
            }
        }
    }

    Ok(values)
}

fn flatten_into(url: &str, value: &Value, out: &mut BTreeSet<String>) -> Result<(), PolicyError> {
    match value {
        Value::Null => {}
        Value::String(s) => {
            out.insert(s.clone());
        }
        Value::Number(n) => {
            out.insert(n.to_string());
        }
        Value::Bool(b) => {
            out.insert(b.to_string());
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(url, item, out)?;
            }
        }
        Value::Object(_) => {
            return Err(PolicyError::extraction(
                url,
                "expression addresses objects, not values",
            ));
        }
    }
    Ok(())
}

/// Reads `file://` URLs and bare paths from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileValueSource;

#[async_trait]
impl ValueSource for FileValueSource {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RemoteError::new("Io", format!("{}: {}", path, e)))
    }
}

/// Fetches `http://` and `https://` URLs.
#[derive(Debug, Clone, Default)]
pub struct HttpValueSource {
    client: reqwest::Client,
}

impl HttpValueSource {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ValueSource for HttpValueSource {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::new("RequestFailed", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::new(
                format!("Http{}", status.as_u16()),
                format!("GET {} returned {}", url, status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| RemoteError::new("RequestFailed", e.to_string()))
    }
}

/// Dispatches on the URL scheme: HTTP(S) over the network, everything else
/// from the filesystem.
#[derive(Debug, Clone, Default)]
pub struct DefaultValueSource {
    file: FileValueSource,
    http: HttpValueSource,
}

#[async_trait]
impl ValueSource for DefaultValueSource {
    async fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url).await
        } else {
            self.file.fetch(url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_json_with_expression() {
        let from = ValuesFrom::new("https://example.com/accounts.json")
            .with_expr("accounts[].canonical_id");
        let body = r#"{"accounts": [
            {"name": "a", "canonical_id": "c-1"},
            {"name": "b", "canonical_id": "c-2"},
            {"name": "c"}
        ]}"#;
        assert_eq!(extract_values(&from, body).unwrap(), set(&["c-1", "c-2"]));
    }

    #[test]
    fn test_extract_flattens_nested_lists_and_scalars() {
        let from = ValuesFrom::new("list.json").with_expr("groups");
        let body = r#"{"groups": [["a", "b"], ["c"], 7, true]}"#;
        assert_eq!(
            extract_values(&from, body).unwrap(),
            set(&["a", "b", "c", "7", "true"])
        );
    }

    #[test]
    fn test_extract_object_without_expression_yields_keys() {
        let from = ValuesFrom::new("owners.yaml");
        let body = "c-1: team-a\nc-2: team-b\n";
        assert_eq!(extract_values(&from, body).unwrap(), set(&["c-1", "c-2"]));
    }

    #[test]
    fn test_extract_txt_lines() {
        let from = ValuesFrom::new("/etc/accounts.txt");
        assert_eq!(
            extract_values(&from, "c-1\n\n  c-2  \n").unwrap(),
            set(&["c-1", "c-2"])
        );
    }

    #[test]
    fn test_extract_missing_path_is_error() {
        let from = ValuesFrom::new("accounts.json").with_expr("nope[].id");
        let err = extract_values(&from, r#"{"accounts": []}"#).unwrap_err();
        assert!(matches!(err, PolicyError::ExtractionError { .. }));
    }

    #[test]
    fn test_extract_empty_list_is_empty_set() {
        let from = ValuesFrom::new("accounts.json").with_expr("accounts");
        assert!(extract_values(&from, r#"{"accounts": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_extract_objects_are_not_values() {
        let from = ValuesFrom::new("accounts.json").with_expr("accounts[]");
        let err = extract_values(&from, r#"{"accounts": [{"id": 1}]}"#).unwrap_err();
        assert!(matches!(err, PolicyError::ExtractionError { .. }));
    }

    #[test]
    fn test_extract_requires_known_format() {
        let from = ValuesFrom::new("https://example.com/accounts");
        assert!(matches!(
            extract_values(&from, "[]"),
            Err(PolicyError::ExtractionError { .. })
        ));

        let declared = from.with_format(ValuesFormat::Json);
        assert_eq!(extract_values(&declared, r#"["x"]"#).unwrap(), set(&["x"]));
    }

    #[tokio::test]
    async fn test_resolve_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"ids": ["a", "b"]}}"#).unwrap();

        let resolver = ExternalValueResolver::new(Arc::new(DefaultValueSource::default()));
        let url = format!("file://{}", file.path().display());
        let values = resolver
            .resolve(&ValuesFrom::new(url).with_expr("ids"))
            .await
            .unwrap();
        assert_eq!(values, set(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_resolve_unreachable_source() {
        let resolver = ExternalValueResolver::new(Arc::new(FileValueSource));
        let err = resolver
            .resolve(&ValuesFrom::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::SourceUnreachable { .. }));
    }
}
