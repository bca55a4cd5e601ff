//! QTI 2.1 item generation and packaging.
//!
//! Turns [`qti_model::Question`] records into `assessmentItem` documents with
//! Inspera extensions, relocates embedded files and packs everything into a
//! content package with an `imsmanifest.xml` index.
//!
//! The pipeline for one question runs forward only: asset rewriting,
//! sanitizing, response fragment building, item assembly, archiving.
//! [`ExportSession`] drives it for a whole run.

pub mod archive;
pub mod assets;
pub mod common;
pub mod context;
pub mod error;
pub mod export;
pub mod item;
pub mod manifest;
pub mod response;
pub mod sanitize;

pub use archive::{ArchiveSink, MemoryArchive, ZipArchive};
pub use assets::{
    ASSET_DIR, AssetCopy, AssetReference, AssetResolver, AssetRewriter, PLUGINFILE_MARKER,
    RelocatedAssets, relocate_assets,
};
pub use context::{RunContext, item_path};
pub use error::{ExportError, Result};
pub use export::{EmittedItem, ExportOutcome, ExportSession, ExportSummary, SkippedQuestion};
pub use item::{ItemBuild, QtiItem, assemble, build_item};
pub use manifest::{MANIFEST_PATH, Manifest, ManifestEntry};
pub use response::{ItemResponses, ResponseFragmentSet, SkipReason, build_responses};
pub use sanitize::{decode_text, sanitize_html};
