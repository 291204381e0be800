//! The composition seam between the runner and the media layer.

use async_trait::async_trait;

use shortgen_media::{CompositionOptions, CompositionOutcome, Compositor, MediaResult};
use shortgen_models::ScriptDocument;

/// Produces the final video for a fully populated document.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(
        &self,
        doc: &ScriptDocument,
        options: &CompositionOptions,
    ) -> MediaResult<CompositionOutcome>;
}

#[async_trait]
impl Composer for Compositor {
    async fn compose(
        &self,
        doc: &ScriptDocument,
        options: &CompositionOptions,
    ) -> MediaResult<CompositionOutcome> {
        Compositor::compose(self, doc, options).await
    }
}
