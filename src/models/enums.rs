use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ModelError;

/// Macro to generate a closed enum with as_str + std::str::FromStr + serde as the string form.
///
/// `FromStr` is strict apart from ASCII case. Lenient mapping of legacy
/// values lives in `registry::canonical`.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ModelError::InvalidEnum {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(
    /// Access classification. Recorded and displayed, never enforced here.
    AssetTier {
        Free => "free",
        Member => "member",
        Architect => "architect",
        InnerCircle => "inner-circle",
    }
);

str_enum!(AssetType {
    Editorial => "editorial",
    Framework => "framework",
    Playbook => "playbook",
    Guide => "guide",
    Worksheet => "worksheet",
    Assessment => "assessment",
    Tool => "tool",
    Tracker => "tracker",
    Journal => "journal",
    Canvas => "canvas",
    Other => "other",
});

str_enum!(FileFormat {
    Pdf => "PDF",
    Docx => "DOCX",
    Xlsx => "XLSX",
    Pptx => "PPTX",
    Csv => "CSV",
    Zip => "ZIP",
    Png => "PNG",
    Jpg => "JPG",
    Markdown => "MD",
    Binary => "BINARY",
});

str_enum!(PaperFormat {
    A4 => "A4",
    Letter => "Letter",
    A3 => "A3",
});

str_enum!(QualityTier {
    Draft => "draft",
    Standard => "standard",
    Premium => "premium",
});

str_enum!(FieldStyle {
    Text => "text",
    Multiline => "multiline",
    Checkbox => "checkbox",
});

str_enum!(
    /// Where a registry record came from.
    RecordSource {
        Catalog => "catalog",
        Discovered => "discovered",
    }
);

str_enum!(Confidence {
    Declared => "declared",
    Low => "low",
});

impl AssetTier {
    /// Ordering used for manifest and listing sorts (least restrictive first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Member => 1,
            Self::Architect => 2,
            Self::InnerCircle => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Member => "MEMBER",
            Self::Architect => "ARCHITECT",
            Self::InnerCircle => "INNER CIRCLE",
        }
    }
}

impl FileFormat {
    /// File extensions accepted for this format, lower-case, without dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Docx => &["docx"],
            Self::Xlsx => &["xlsx"],
            Self::Pptx => &["pptx"],
            Self::Csv => &["csv"],
            Self::Zip => &["zip"],
            Self::Png => &["png"],
            Self::Jpg => &["jpg", "jpeg"],
            Self::Markdown => &["md", "markdown"],
            Self::Binary => &[],
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|f| f.extensions().contains(&ext.as_str()))
            .unwrap_or(Self::Binary)
    }

    /// True when a file with this extension is a valid home for the format.
    /// `Binary` accepts any extension.
    pub fn matches_extension(&self, ext: Option<&str>) -> bool {
        match (self, ext) {
            (Self::Binary, _) => true,
            (_, None) => false,
            (format, Some(ext)) => format
                .extensions()
                .contains(&ext.to_ascii_lowercase().as_str()),
        }
    }

    /// Only PDFs have a generation strategy in the template engine.
    pub fn is_generatable(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl PaperFormat {
    /// Page size in millimetres (portrait).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
            Self::A3 => (297.0, 420.0),
        }
    }

    /// Lower-cased token appended to variant file names.
    pub fn token(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl Default for PaperFormat {
    fn default() -> Self {
        Self::A4
    }
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tier_round_trip() {
        for tier in AssetTier::all() {
            assert_eq!(AssetTier::from_str(tier.as_str()).unwrap(), *tier);
        }
        assert_eq!(AssetTier::InnerCircle.as_str(), "inner-circle");
    }

    #[test]
    fn from_str_ignores_ascii_case_only() {
        assert_eq!(PaperFormat::from_str("letter").unwrap(), PaperFormat::Letter);
        assert_eq!(FileFormat::from_str("pdf").unwrap(), FileFormat::Pdf);
        assert!(AssetTier::from_str("inner circle").is_err());
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(AssetType::from_str("download").is_err());
        assert!(PaperFormat::from_str("B5").is_err());
        assert!(QualityTier::from_str("").is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&AssetTier::InnerCircle).unwrap();
        assert_eq!(json, "\"inner-circle\"");
        let back: FileFormat = serde_json::from_str("\"DOCX\"").unwrap();
        assert_eq!(back, FileFormat::Docx);
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(FileFormat::from_extension("PDF"), FileFormat::Pdf);
        assert_eq!(FileFormat::from_extension("jpeg"), FileFormat::Jpg);
        assert_eq!(FileFormat::from_extension("exe"), FileFormat::Binary);
        assert!(FileFormat::Pdf.matches_extension(Some("pdf")));
        assert!(!FileFormat::Pdf.matches_extension(Some("docx")));
        assert!(!FileFormat::Pdf.matches_extension(None));
        assert!(FileFormat::Binary.matches_extension(None));
    }

    #[test]
    fn paper_tokens_are_lower_case() {
        assert_eq!(PaperFormat::Letter.token(), "letter");
        assert_eq!(PaperFormat::A3.dimensions_mm(), (297.0, 420.0));
    }

    #[test]
    fn tier_rank_orders_by_restriction() {
        let mut tiers = AssetTier::all().to_vec();
        tiers.sort_by_key(|t| t.rank());
        assert_eq!(tiers.first(), Some(&AssetTier::Free));
        assert_eq!(tiers.last(), Some(&AssetTier::InnerCircle));
    }
}
