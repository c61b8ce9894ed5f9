//! Canonicalization: the one place that maps loosely-typed or legacy field
//! values onto closed enums.
//!
//! Nothing here returns an error. Every input maps to exactly one value,
//! with the defaults documented per field:
//!
//! | Field  | Unrecognized input           | Result                         |
//! |--------|------------------------------|--------------------------------|
//! | tier   | anything outside the aliases | [`UNRECOGNIZED_TIER_FALLBACK`] |
//! | type   | `download` / `downloads`     | `tool`                         |
//! | type   | anything else                | `other`                        |
//! | format | empty                        | inferred from the extension    |
//! | format | anything else                | `BINARY`                       |
//! | path   | no leading slash             | `/` prepended                  |
//! | path   | legacy root prefix           | prefix stripped                |

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::models::{
    default_version, AssetTier, AssetType, Confidence, FileFormat, PaperFormat, RecordSource,
    RuntimeAssetRecord,
};

/// Tier given to records whose tier is missing or unrecognized.
///
/// This is the least restrictive tier. It was inherited from the site's
/// original behaviour and is pending product sign-off: switching it to
/// `InnerCircle` would hide every malformed record behind the highest gate.
pub const UNRECOGNIZED_TIER_FALLBACK: AssetTier = AssetTier::Free;

/// Knobs the canonicalizer needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPolicy {
    pub unrecognized_tier: AssetTier,
    pub legacy_prefixes: Vec<String>,
}

impl Default for CanonicalPolicy {
    fn default() -> Self {
        Self {
            unrecognized_tier: UNRECOGNIZED_TIER_FALLBACK,
            legacy_prefixes: vec!["/public".into()],
        }
    }
}

impl CanonicalPolicy {
    pub fn with_legacy_prefixes(prefixes: &[String]) -> Self {
        Self {
            legacy_prefixes: prefixes.to_vec(),
            ..Self::default()
        }
    }
}

/// Lower-case, trimmed, with `_` and whitespace collapsed to `-`.
fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.trim().chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            pending_dash = !key.is_empty();
            continue;
        }
        if pending_dash {
            key.push('-');
            pending_dash = false;
        }
        key.extend(c.to_lowercase());
    }
    key
}

// ═══════════════════════════════════════════
// Field mappings
// ═══════════════════════════════════════════

pub fn canonical_tier(raw: &str, policy: &CanonicalPolicy) -> AssetTier {
    match normalize_key(raw).as_str() {
        "free" | "public" | "open" => AssetTier::Free,
        "member" | "members" | "subscriber" => AssetTier::Member,
        "architect" | "architects" => AssetTier::Architect,
        "inner-circle" | "innercircle" | "inner" => AssetTier::InnerCircle,
        _ => policy.unrecognized_tier,
    }
}

pub fn canonical_type(raw: &str) -> AssetType {
    match normalize_key(raw).as_str() {
        "editorial" | "editorials" | "article" | "essay" => AssetType::Editorial,
        "framework" | "frameworks" => AssetType::Framework,
        "playbook" | "playbooks" => AssetType::Playbook,
        "guide" | "guides" => AssetType::Guide,
        "worksheet" | "worksheets" => AssetType::Worksheet,
        "assessment" | "assessments" => AssetType::Assessment,
        "tool" | "tools" | "download" | "downloads" => AssetType::Tool,
        "tracker" | "trackers" => AssetType::Tracker,
        "journal" | "journals" => AssetType::Journal,
        "canvas" | "canvases" => AssetType::Canvas,
        _ => AssetType::Other,
    }
}

/// Declared format wins when recognized; an empty declaration falls back to
/// the extension of `path`.
pub fn canonical_format(raw: &str, path: &str) -> FileFormat {
    let key = raw.trim().trim_start_matches('.');
    if key.is_empty() {
        return Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(FileFormat::from_extension)
            .unwrap_or(FileFormat::Binary);
    }
    key.parse::<FileFormat>()
        .unwrap_or_else(|_| FileFormat::from_extension(key))
}

pub fn canonical_paper(raw: &str) -> Option<PaperFormat> {
    match normalize_key(raw).as_str() {
        "a4" => Some(PaperFormat::A4),
        "letter" | "us-letter" => Some(PaperFormat::Letter),
        "a3" => Some(PaperFormat::A3),
        _ => None,
    }
}

/// Site-rooted, forward-slashed, legacy prefix removed, no duplicate slashes.
pub fn canonical_path(raw: &str, policy: &CanonicalPolicy) -> String {
    let mut path = raw.trim().replace('\\', "/");
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    for prefix in &policy.legacy_prefixes {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            continue;
        }
        let prefix = if prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };
        if path == prefix {
            path = "/".into();
        } else if path.starts_with(&format!("{prefix}/")) {
            path = path[prefix.len()..].to_string();
        }
    }
    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

// ═══════════════════════════════════════════
// Raw record (as read from the generated registry)
// ═══════════════════════════════════════════

/// Accepts `true`, `"true"`, `"yes"`, `1`, `null`...
fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => {
            matches!(normalize_key(&s).as_str(), "true" | "yes" | "1" | "y")
        }
        _ => false,
    })
}

fn loose_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn scalar_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strings as is, numbers and booleans stringified, anything else empty.
fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn loose_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_text(value).filter(|s| !s.is_empty()))
}

/// An array keeps its scalar items; a lone string becomes a one-item list.
fn loose_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    })
}

/// One registry entry with every field optional and untyped. A wrongly
/// typed field degrades to its default without touching its neighbours.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAssetRecord {
    #[serde(deserialize_with = "loose_string")]
    pub id: String,
    #[serde(deserialize_with = "loose_string")]
    pub key: String,
    #[serde(deserialize_with = "loose_string")]
    pub title: String,
    #[serde(deserialize_with = "loose_string", alias = "excerpt")]
    pub description: String,
    #[serde(deserialize_with = "loose_string", rename = "type", alias = "assetType")]
    pub asset_type: String,
    #[serde(deserialize_with = "loose_string")]
    pub tier: String,
    #[serde(deserialize_with = "loose_string")]
    pub category: String,
    #[serde(deserialize_with = "loose_strings")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "loose_strings")]
    pub paper_formats: Vec<String>,
    #[serde(deserialize_with = "loose_opt_string")]
    pub paper_variant: Option<String>,
    #[serde(deserialize_with = "loose_string", alias = "format")]
    pub file_format: String,
    #[serde(deserialize_with = "loose_string", alias = "path", alias = "output_path")]
    pub output_path: String,
    #[serde(deserialize_with = "loose_bool")]
    pub interactive: bool,
    #[serde(deserialize_with = "loose_bool")]
    pub fillable: bool,
    #[serde(deserialize_with = "loose_bool", alias = "requires_auth")]
    pub requires_auth: bool,
    #[serde(deserialize_with = "loose_string")]
    pub version: String,
    #[serde(deserialize_with = "loose_string")]
    pub source: String,
    #[serde(deserialize_with = "loose_string")]
    pub confidence: String,
    #[serde(deserialize_with = "loose_string")]
    pub mime_type: String,
    #[serde(deserialize_with = "loose_bool")]
    pub exists: bool,
    #[serde(deserialize_with = "loose_u64")]
    pub size_bytes: u64,
    #[serde(deserialize_with = "loose_opt_string")]
    pub mtime: Option<String>,
    #[serde(deserialize_with = "loose_opt_string")]
    pub hash: Option<String>,
}

/// Turn a raw record into a runtime record. Total: never fails, never drops.
pub fn canonicalize(raw: &RawAssetRecord, policy: &CanonicalPolicy) -> RuntimeAssetRecord {
    let output_path = canonical_path(&raw.output_path, policy);
    let paper_variant = raw.paper_variant.as_deref().and_then(canonical_paper);
    let mut paper_formats: Vec<PaperFormat> = Vec::new();
    for paper in raw.paper_formats.iter().filter_map(|p| canonical_paper(p)) {
        if !paper_formats.contains(&paper) {
            paper_formats.push(paper);
        }
    }

    let id = raw.id.trim().to_string();
    let key = match (raw.key.trim(), paper_variant) {
        (k, _) if !k.is_empty() => k.to_string(),
        (_, Some(paper)) => format!("{id}@{}", paper.token()),
        (_, None) => id.clone(),
    };
    let title = if raw.title.trim().is_empty() {
        id.clone()
    } else {
        raw.title.trim().to_string()
    };
    let version = if raw.version.trim().is_empty() {
        default_version()
    } else {
        raw.version.trim().to_string()
    };
    let mime_type = if raw.mime_type.trim().is_empty() {
        mime_guess::from_path(&output_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    } else {
        raw.mime_type.trim().to_string()
    };

    RuntimeAssetRecord {
        key,
        title,
        description: raw.description.trim().to_string(),
        asset_type: canonical_type(&raw.asset_type),
        tier: canonical_tier(&raw.tier, policy),
        category: raw.category.trim().to_string(),
        tags: raw
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        paper_formats,
        paper_variant,
        file_format: canonical_format(&raw.file_format, &output_path),
        output_path,
        interactive: raw.interactive,
        fillable: raw.fillable,
        requires_auth: raw.requires_auth,
        version,
        source: if normalize_key(&raw.source) == "discovered" {
            RecordSource::Discovered
        } else {
            RecordSource::Catalog
        },
        confidence: if normalize_key(&raw.confidence) == "low" {
            Confidence::Low
        } else {
            Confidence::Declared
        },
        mime_type,
        exists: raw.exists,
        size_bytes: raw.size_bytes,
        mtime: raw.mtime.clone(),
        hash: raw.hash.clone(),
        id,
    }
}
