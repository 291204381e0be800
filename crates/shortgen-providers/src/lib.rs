//! Asset providers for the short-video pipeline.
//!
//! Each provider implements [`AssetProvider`] for one [`AssetKind`]:
//!
//! - [`PexelsProvider`]: stock photos for web-image scenes
//! - [`ImagenProvider`]: generated stills
//! - [`FalVideoProvider`]: motion clips animated from a scene's still
//! - [`DeepgramProvider`]: narration audio
//! - [`FalMusicProvider`]: background music
//!
//! [`AssetKind`]: shortgen_models::AssetKind

pub mod deepgram;
pub mod error;
pub mod fal;
pub mod http;
pub mod imagen;
pub mod pexels;
pub mod provider;

pub use deepgram::{DeepgramConfig, DeepgramProvider};
pub use error::{ProviderError, ProviderResult};
pub use fal::{FalClient, FalConfig, FalMusicProvider, FalVideoProvider};
pub use imagen::{ImagenConfig, ImagenProvider};
pub use pexels::{PexelsConfig, PexelsProvider};
pub use provider::{responsibilities, AssetProvider, GenerationRequest};
