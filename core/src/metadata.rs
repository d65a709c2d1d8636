use serde_json::Value;

/// The parts of a post's `json_metadata` the filters look at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostMetadata {
    pub tags: Vec<String>,
    /// Publishing app without its version suffix (`steemit/0.1` -> `steemit`).
    pub app: Option<String>,
}

impl PostMetadata {
    /// Lenient parse: malformed JSON yields empty metadata, a single string
    /// tag is treated as a one-element list.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => return Self::default(),
        };

        let tags = match value.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|t| t.as_str())
                .map(str::to_string)
                .collect(),
            Some(Value::String(tag)) => vec![tag.clone()],
            _ => Vec::new(),
        };

        let app = value
            .get("app")
            .and_then(|a| a.as_str())
            .and_then(|a| a.split('/').next())
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        Self { tags, app }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_and_app() {
        let meta = PostMetadata::parse(r#"{"tags":["life","photo"],"app":"busy/2.4.0"}"#);
        assert_eq!(meta.tags, vec!["life", "photo"]);
        assert_eq!(meta.app.as_deref(), Some("busy"));
    }

    #[test]
    fn test_single_string_tag() {
        let meta = PostMetadata::parse(r#"{"tags":"life"}"#);
        assert_eq!(meta.tags, vec!["life"]);
        assert!(meta.app.is_none());
    }

    #[test]
    fn test_malformed_metadata_is_empty() {
        assert_eq!(PostMetadata::parse("not json"), PostMetadata::default());
        assert_eq!(PostMetadata::parse(""), PostMetadata::default());
    }
}
