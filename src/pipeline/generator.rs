//! The generation seam: one record in, document bytes out.
//!
//! The orchestrator only knows [`AssetGenerator`]; the template engine is the
//! production implementation, tests swap in fakes.

use super::error::GenerationError;
use crate::models::{FileFormat, RuntimeAssetRecord};
use crate::render::{self, RenderOptions, RenderedDocument};

/// Produces the bytes for one record. Runs on the blocking pool.
pub trait AssetGenerator: Send + Sync {
    fn generate(
        &self,
        record: &RuntimeAssetRecord,
        options: &RenderOptions,
    ) -> Result<RenderedDocument, GenerationError>;
}

/// PDF generation through the template engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl AssetGenerator for TemplateGenerator {
    fn generate(
        &self,
        record: &RuntimeAssetRecord,
        options: &RenderOptions,
    ) -> Result<RenderedDocument, GenerationError> {
        if record.file_format != FileFormat::Pdf {
            return Err(GenerationError::NotGeneratable {
                id: record.id.clone(),
                format: record.file_format.to_string(),
            });
        }
        Ok(render::render(record, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetTier, AssetType, Confidence, PaperFormat, RecordSource};

    fn record(format: FileFormat) -> RuntimeAssetRecord {
        RuntimeAssetRecord {
            id: "deck".into(),
            key: "deck".into(),
            title: "Deck".into(),
            description: String::new(),
            asset_type: AssetType::Guide,
            tier: AssetTier::Free,
            category: String::new(),
            tags: Vec::new(),
            paper_formats: vec![PaperFormat::A4],
            paper_variant: None,
            file_format: format,
            output_path: "/d/deck.pdf".into(),
            interactive: false,
            fillable: false,
            requires_auth: false,
            version: "1.0.0".into(),
            source: RecordSource::Catalog,
            confidence: Confidence::Declared,
            mime_type: String::new(),
            exists: false,
            size_bytes: 0,
            mtime: None,
            hash: None,
        }
    }

    #[test]
    fn generator_is_object_safe() {
        fn _assert(_: &dyn AssetGenerator) {}
    }

    #[test]
    fn non_pdf_is_rejected() {
        let r = record(FileFormat::Pptx);
        let opts = RenderOptions::for_record(&r, "Folio");
        let err = TemplateGenerator.generate(&r, &opts).unwrap_err();
        assert!(matches!(err, GenerationError::NotGeneratable { ref format, .. } if format == "PPTX"));
        assert!(!err.is_transient());
    }

    #[test]
    fn pdf_goes_through_template_engine() {
        let r = record(FileFormat::Pdf);
        let opts = RenderOptions::for_record(&r, "Folio");
        let doc = TemplateGenerator.generate(&r, &opts).unwrap();
        assert_eq!(&doc.bytes[0..4], b"%PDF");
    }
}
