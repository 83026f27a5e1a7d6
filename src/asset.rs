//! Photo descriptors passed from extraction to download.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::download::file_name_from_url;

/// One photo of an album: where it comes from and where it goes.
///
/// Created by the extractor with only a source URL; the orchestrator fills
/// in the target before the download starts. Never mutated afterwards:
/// [`with_target`](Self::with_target) returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDescriptor {
    source_url: String,
    target_path: Option<PathBuf>,
}

impl AssetDescriptor {
    /// Creates a descriptor with no target yet.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            target_path: None,
        }
    }

    /// Returns a copy of this descriptor saved to `target_path`.
    #[must_use]
    pub fn with_target(&self, target_path: impl Into<PathBuf>) -> Self {
        Self {
            source_url: self.source_url.clone(),
            target_path: Some(target_path.into()),
        }
    }

    /// Absolute URL the photo is downloaded from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Destination path, if one has been assigned.
    #[must_use]
    pub fn target_path(&self) -> Option<&Path> {
        self.target_path.as_deref()
    }

    /// Local file name derived from the source URL.
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name_from_url(&self.source_url)
    }
}

impl fmt::Display for AssetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Pairs every extracted photo with `target_dir/<file name>`, keeping page order.
#[must_use]
pub fn assign_targets(assets: &[AssetDescriptor], target_dir: &Path) -> Vec<AssetDescriptor> {
    assets
        .iter()
        .map(|asset| asset.with_target(target_dir.join(asset.file_name())))
        .collect()
}
