//! The asset provider contract.
//!
//! A provider knows which items of a document it owns and how to produce one
//! artifact file for one item. Skip-existing checks, retries, timeouts,
//! fan-out and merging results into the document are handled once by the
//! pipeline runner for every provider.

use async_trait::async_trait;
use std::path::Path;

use shortgen_models::{AssetKind, Scene, ScriptDocument, VisualType, WorkItem};

use crate::error::{ProviderError, ProviderResult};

/// Everything a provider needs to produce one artifact.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub doc: &'a ScriptDocument,
    pub item: WorkItem,
    /// Final artifact path. Providers publish it atomically.
    pub output: &'a Path,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(doc: &'a ScriptDocument, item: WorkItem, output: &'a Path) -> Self {
        Self { doc, item, output }
    }

    /// The scene this request targets.
    pub fn scene(&self) -> ProviderResult<&'a Scene> {
        match self.item {
            WorkItem::Scene(index) => self.doc.scene(index).ok_or(ProviderError::UnknownScene(index)),
            WorkItem::Document => Err(ProviderError::Precondition(
                "document-scoped request has no scene".to_string(),
            )),
        }
    }
}

#[async_trait]
pub trait AssetProvider: Send + Sync {
    fn kind(&self) -> AssetKind;

    /// Items of `doc` this provider is responsible for.
    fn work_items(&self, doc: &ScriptDocument) -> Vec<WorkItem> {
        responsibilities(self.kind(), doc)
    }

    /// Produce the artifact for `request.item` at `request.output`.
    async fn generate(&self, request: &GenerationRequest<'_>) -> ProviderResult<()>;
}

/// Which items a provider of `kind` owns.
///
/// Image generation also covers generated-video scenes, whose motion clips
/// start from a still. Video generation only takes scenes that already have
/// that still.
pub fn responsibilities(kind: AssetKind, doc: &ScriptDocument) -> Vec<WorkItem> {
    match kind {
        AssetKind::WebImage => scenes_where(doc, |s| s.visual_type == VisualType::WebImage),
        AssetKind::GeneratedImage => scenes_where(doc, |s| {
            matches!(s.visual_type, VisualType::GeneratedImage | VisualType::GeneratedVideo)
        }),
        AssetKind::GeneratedVideo => scenes_where(doc, |s| {
            s.visual_type == VisualType::GeneratedVideo && s.image_path.is_some()
        }),
        AssetKind::Narration | AssetKind::Music => vec![WorkItem::Document],
    }
}

fn scenes_where(doc: &ScriptDocument, pred: impl Fn(&Scene) -> bool) -> Vec<WorkItem> {
    doc.scenes
        .iter()
        .filter(|s| pred(s))
        .map(|s| WorkItem::Scene(s.index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortgen_models::test_support::sample_document_with_mode;
    use shortgen_models::VisualMode;

    #[test]
    fn test_mixed_document_responsibilities() {
        let mut doc = sample_document_with_mode(30, VisualMode::Mixed);

        assert_eq!(
            responsibilities(AssetKind::WebImage, &doc),
            vec![
                WorkItem::Scene(2),
                WorkItem::Scene(3),
                WorkItem::Scene(4),
                WorkItem::Scene(5)
            ]
        );
        assert_eq!(
            responsibilities(AssetKind::GeneratedImage, &doc),
            vec![WorkItem::Scene(1), WorkItem::Scene(6)]
        );
        // No stills yet, so no motion work.
        assert!(responsibilities(AssetKind::GeneratedVideo, &doc).is_empty());

        doc.scenes[0].image_path = Some("images/scene-1.jpg".into());
        assert_eq!(
            responsibilities(AssetKind::GeneratedVideo, &doc),
            vec![WorkItem::Scene(1)]
        );
        assert_eq!(responsibilities(AssetKind::Music, &doc), vec![WorkItem::Document]);
    }

    #[test]
    fn test_request_scene_lookup() {
        let doc = sample_document_with_mode(10, VisualMode::WebImages);
        let out = Path::new("images/scene-2.jpg");
        let request = GenerationRequest::new(&doc, WorkItem::Scene(2), out);
        assert_eq!(request.scene().unwrap().index, 2);

        let missing = GenerationRequest::new(&doc, WorkItem::Scene(9), out);
        assert!(matches!(missing.scene(), Err(ProviderError::UnknownScene(9))));

        let document = GenerationRequest::new(&doc, WorkItem::Document, out);
        assert!(document.scene().is_err());
    }
}
