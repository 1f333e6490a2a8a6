use std::path::{Path, PathBuf};

use anvil_console_types::Artifact;
use anyhow::{Context, Result};
use tracing::info;

/// Write `artifact` into `dir`, creating the directory if needed.
///
/// Returns the path written. An existing file with the same name is replaced.
pub async fn save_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("could not create artifact directory {}", dir.display()))?;
    let path = dir.join(&artifact.suggested_filename);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("could not write artifact {}", path.display()))?;
    info!(path = %path.display(), bytes = artifact.bytes.len(), mime = %artifact.mime_type, "saved artifact");
    Ok(path)
}
