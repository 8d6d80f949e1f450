//! Agent archive extraction (`.tar.gz`).

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::ArchiveExtractor;
use crate::domain::error::ProvisionError;

/// `tar` + `flate2` extractor, run on the blocking pool.
pub struct TarGzExtractor;

impl ArchiveExtractor for TarGzExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest.to_path_buf();
        tokio::task::spawn_blocking(move || unpack(&archive_owned, &dest_owned))
            .await
            .context("spawn_blocking for extraction")?
            .map_err(|e| {
                ProvisionError::Extraction {
                    archive: archive.display().to_string(),
                    reason: format!("{e:#}"),
                }
                .into()
            })
    }
}

fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    let mut count = 0;
    for entry in tar.entries().context("reading archive")? {
        let mut entry = entry.context("reading entry")?;
        // unpack_in refuses paths that escape `dest`.
        if entry.unpack_in(dest).context("unpacking entry")? {
            count += 1;
        }
    }
    anyhow::ensure!(count > 0, "archive contains no files");
    tracing::debug!(entries = count, dest = %dest.display(), "archive extracted");
    Ok(())
}
