//! Concatenates a job's segments into the finished file with ffmpeg.

use super::scratch::ScratchArea;
use super::sequencer::Manifest;
use super::types::{AudioEncoding, OutputFormat};
use crate::error::{NarratorError, Result};
use crate::exec::CommandExecutor;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of an assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    Assembled { destination: PathBuf, segments: usize },
    /// The manifest was empty; nothing was written.
    NothingToAssemble,
}

pub struct Assembler {
    executor: Arc<dyn CommandExecutor>,
    ffmpeg: String,
}

impl Assembler {
    pub fn new(executor: Arc<dyn CommandExecutor>, ffmpeg: &str) -> Self {
        Self {
            executor,
            ffmpeg: ffmpeg.to_string(),
        }
    }

    /// Mux the manifest's segments, in order, into `destination`.
    ///
    /// ffmpeg writes into the scratch area first and the result is moved
    /// into place only after a successful exit, so a failed run never
    /// leaves a partial file at `destination`. The scratch area is removed
    /// on success and dropped (and thereby removed or retained) on failure.
    pub async fn assemble(
        &self,
        scratch: ScratchArea,
        manifest: &Manifest,
        destination: &Path,
        format: OutputFormat,
        source: AudioEncoding,
    ) -> Result<AssemblyOutcome> {
        if manifest.is_empty() {
            tracing::info!(destination = %destination.display(), "No speakable text, skipping assembly");
            scratch.discard()?;
            return Ok(AssemblyOutcome::NothingToAssemble);
        }

        let staging = scratch
            .path()
            .join(format!("assembled.{}", format.extension()));
        let args = concat_args(manifest.path(), &staging, format, source);

        self.executor
            .execute(&self.ffmpeg, &args)
            .await
            .map_err(|e| assembly_failed(destination, e.to_string()))?;

        if !staging.is_file() {
            return Err(assembly_failed(
                destination,
                format!("{} reported success but produced no output", self.ffmpeg),
            ));
        }

        move_into_place(&staging, destination)
            .map_err(|e| assembly_failed(destination, e.to_string()))?;
        scratch.discard()?;

        tracing::info!(
            destination = %destination.display(),
            segments = manifest.len(),
            "Assembled"
        );
        Ok(AssemblyOutcome::Assembled {
            destination: destination.to_path_buf(),
            segments: manifest.len(),
        })
    }
}

fn assembly_failed(destination: &Path, message: String) -> NarratorError {
    NarratorError::AssemblyFailed {
        destination: destination.display().to_string(),
        message,
    }
}

/// ffmpeg arguments for the concat demuxer.
fn concat_args(list: &Path, output: &Path, format: OutputFormat, source: AudioEncoding) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(list.display().to_string());
    args.extend(format.codec_args(source));
    args.push(output.display().to_string());
    args
}

/// Rename, falling back to copy when the scratch root is on another filesystem.
fn move_into_place(from: &Path, to: &Path) -> std::io::Result<()> {
    let parent = match to.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    tracing::debug!(from = %from.display(), to = %to.display(), "Rename failed, copying instead");
    copy_into_place(&mut fs::File::open(from)?, parent, to)?;
    fs::remove_file(from)?;
    Ok(())
}

/// Copy `source` into a temporary sibling of `to` and rename it over `to`
/// once complete. The temporary file is removed if the copy fails.
fn copy_into_place(source: &mut impl Read, parent: &Path, to: &Path) -> std::io::Result<()> {
    let mut partial = tempfile::Builder::new()
        .prefix(".narrator-partial-")
        .tempfile_in(parent)?;
    std::io::copy(source, partial.as_file_mut())?;
    partial.as_file().sync_all()?;
    partial.persist(to).map_err(|e| e.error)?;
    Ok(())
}
