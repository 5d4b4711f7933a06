//! YAML front matter: extraction, normalization and validation.

use crate::error::PipelineError;
use folio_types::DocumentMetadata;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const FENCE: &str = "---";

/// Splits `text` into its front-matter block and the remaining body.
///
/// The block must open on the first line with `---` and close with a line
/// holding `---` or `...`. Text without an opening fence has no front matter.
pub fn split_front_matter(text: &str) -> Result<(Option<&str>, &str), PipelineError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(first_end) = text.find('\n') else {
        return Ok((None, text));
    };
    if text[..first_end].trim_end() != FENCE {
        return Ok((None, text));
    }

    let yaml_start = first_end + 1;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == FENCE || trimmed == "..." {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((Some(yaml), body));
        }
        offset += line.len();
    }
    Err(PipelineError::FrontMatter("closing '---' not found".to_string()))
}

/// Parses the front matter of `text` into normalized metadata and returns it
/// together with the body. Documents without front matter get empty metadata.
pub fn parse_front_matter(text: &str) -> Result<(DocumentMetadata, &str), PipelineError> {
    let (yaml, body) = split_front_matter(text)?;
    let raw = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => {
            let value: Value =
                serde_yaml::from_str(yaml).map_err(|e| PipelineError::FrontMatter(e.to_string()))?;
            match value {
                Value::Object(map) => map.into_iter().collect(),
                Value::Null => BTreeMap::new(),
                _ => {
                    return Err(PipelineError::FrontMatter(
                        "front matter must be a mapping".to_string(),
                    ));
                }
            }
        }
        _ => BTreeMap::new(),
    };
    Ok((normalize(raw), body))
}

/// Reads a Markdown file and parses its front matter.
pub fn read_metadata(path: &Path) -> Result<DocumentMetadata, PipelineError> {
    let text = fs::read_to_string(path)?;
    parse_front_matter(&text).map(|(metadata, _)| metadata)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Maps raw front-matter fields onto [`DocumentMetadata`].
///
/// `doc_id` is read as `document_id`; `owner` and `effective_date` fill
/// `author` and `date` when those are absent. List values are also exposed
/// comma-joined under `<key>_joined`.
pub fn normalize(mut raw: BTreeMap<String, Value>) -> DocumentMetadata {
    if !raw.contains_key("document_id")
        && let Some(id) = raw.remove("doc_id")
    {
        raw.insert("document_id".to_string(), id);
    }
    for (alias, canonical) in [("owner", "author"), ("effective_date", "date")] {
        if !raw.contains_key(canonical)
            && let Some(value) = raw.get(alias).cloned()
        {
            raw.insert(canonical.to_string(), value);
        }
    }

    let mut take = |key: &str| raw.remove(key).as_ref().and_then(scalar_text);
    let mut metadata = DocumentMetadata {
        document_id: take("document_id"),
        title: take("title"),
        revision: take("revision"),
        author: take("author"),
        status: take("status"),
        date: take("date"),
        extra: BTreeMap::new(),
    };

    let joined: Vec<(String, Value)> = raw
        .iter()
        .filter_map(|(key, value)| {
            let items = value.as_array()?;
            let text = items.iter().filter_map(scalar_text).collect::<Vec<_>>().join(", ");
            Some((format!("{}_joined", key), Value::String(text)))
        })
        .collect();
    metadata.extra = raw;
    metadata.extra.extend(joined);
    metadata
}

/// A gate a document's metadata must pass before it enters the pipeline.
pub trait MetadataValidator: Send + Sync {
    fn validate(&self, metadata: &DocumentMetadata) -> Result<(), PipelineError>;
}

/// Requires a set of fields to be present and non-empty.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self::new(["document_id", "title"])
    }
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn is_present(metadata: &DocumentMetadata, field: &str) -> bool {
        let known = match field {
            "document_id" => Some(&metadata.document_id),
            "title" => Some(&metadata.title),
            "revision" => Some(&metadata.revision),
            "author" => Some(&metadata.author),
            "status" => Some(&metadata.status),
            "date" => Some(&metadata.date),
            _ => None,
        };
        match known {
            Some(value) => value.as_deref().is_some_and(|v| !v.trim().is_empty()),
            None => metadata.extra.get(field).is_some_and(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            }),
        }
    }
}

impl MetadataValidator for RequiredFields {
    fn validate(&self, metadata: &DocumentMetadata) -> Result<(), PipelineError> {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .map(String::as_str)
            .filter(|field| !Self::is_present(metadata, field))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "---\ndoc_id: SOP-200\ntitle: Cleaning\nrevision: 1.0\nowner: QA Team\neffective_date: 2024-03-01\nupstream_apn:\n  - STD-105\n  - REF-001\n---\n# Body\n";

    #[test]
    fn test_split_front_matter() {
        let (yaml, body) = split_front_matter(SAMPLE).unwrap();
        assert!(yaml.unwrap().starts_with("doc_id: SOP-200\n"));
        assert_eq!(body, "# Body\n");

        let (yaml, body) = split_front_matter("# No front matter\n").unwrap();
        assert!(yaml.is_none());
        assert_eq!(body, "# No front matter\n");

        assert!(split_front_matter("---\ntitle: x\n# never closed\n").is_err());
    }

    #[test]
    fn test_aliases_and_joined_lists() {
        let (meta, _) = parse_front_matter(SAMPLE).unwrap();
        assert_eq!(meta.document_id.as_deref(), Some("SOP-200"));
        assert_eq!(meta.revision.as_deref(), Some("1.0"));
        assert_eq!(meta.author.as_deref(), Some("QA Team"));
        assert_eq!(meta.date.as_deref(), Some("2024-03-01"));
        assert_eq!(
            meta.extra.get("upstream_apn_joined"),
            Some(&Value::String("STD-105, REF-001".into()))
        );
        assert!(meta.extra.contains_key("owner"));
        assert!(!meta.extra.contains_key("doc_id"));
    }

    #[test]
    fn test_explicit_fields_win_over_aliases() {
        let (meta, _) =
            parse_front_matter("---\ndocument_id: A-1\ndoc_id: B-2\nauthor: Ann\nowner: Bob\n---\n").unwrap();
        assert_eq!(meta.document_id.as_deref(), Some("A-1"));
        assert_eq!(meta.author.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_required_fields() {
        let validator = RequiredFields::default();
        let (meta, _) = parse_front_matter(SAMPLE).unwrap();
        assert!(validator.validate(&meta).is_ok());

        let (meta, _) = parse_front_matter("---\ntitle: Untracked\n---\n").unwrap();
        let err = validator.validate(&meta).unwrap_err();
        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("document_id"));

        let custom = RequiredFields::new(["upstream_apn"]);
        assert!(custom.validate(&parse_front_matter(SAMPLE).unwrap().0).is_ok());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = parse_front_matter("---\ntitle: [oops\n---\n").unwrap_err();
        assert_eq!(err.category(), "parse");
    }
}
