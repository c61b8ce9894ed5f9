use serde::{Deserialize, Serialize};

/// One hand-authored catalog entry describing an intended downloadable document.
///
/// Enumerated fields (`type`, `tier`, `fileFormat`, `paperFormats`) are kept as
/// authored; the runtime registry canonicalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default, alias = "excerpt")]
    pub description: String,
    #[serde(rename = "type", default)]
    pub asset_type: String,
    #[serde(default)]
    pub tier: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "paper_formats")]
    pub paper_formats: Vec<String>,
    #[serde(default, alias = "file_format", alias = "format")]
    pub file_format: String,
    #[serde(alias = "output_path", alias = "path")]
    pub output_path: String,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub fillable: bool,
    #[serde(default, alias = "requires_auth")]
    pub requires_auth: bool,
    #[serde(default = "default_version")]
    pub version: String,
    /// Lower sorts first; undeclared priorities keep catalog order after all declared ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

pub fn default_version() -> String {
    "1.0.0".into()
}

impl AssetDescriptor {
    /// Minimal descriptor, mostly for tests and synthetic records.
    pub fn new(id: &str, title: &str, output_path: &str) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            asset_type: String::new(),
            tier: String::new(),
            category: String::new(),
            tags: Vec::new(),
            paper_formats: Vec::new(),
            file_format: String::new(),
            output_path: output_path.into(),
            interactive: false,
            fillable: false,
            requires_auth: false,
            version: default_version(),
            priority: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_and_snake_case() {
        let camel: AssetDescriptor = serde_json::from_str(
            r#"{"id":"a","title":"A","outputPath":"/x/a.pdf","requiresAuth":true,"paperFormats":["A4"]}"#,
        )
        .unwrap();
        let snake: AssetDescriptor = serde_json::from_str(
            r#"{"id":"a","title":"A","output_path":"/x/a.pdf","requires_auth":true,"paper_formats":["A4"]}"#,
        )
        .unwrap();
        assert_eq!(camel, snake);
        assert!(camel.requires_auth);
    }

    #[test]
    fn missing_optional_fields_default() {
        let d: AssetDescriptor =
            serde_json::from_str(r#"{"id":"a","title":"A","path":"/x/a.pdf","excerpt":"short"}"#)
                .unwrap();
        assert_eq!(d.description, "short");
        assert_eq!(d.version, "1.0.0");
        assert!(d.tags.is_empty());
        assert_eq!(d.priority, None);
    }
}
