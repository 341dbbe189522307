//! Drives synthesis chunk by chunk and records segment order.

use super::rate::RateBudgetTracker;
use super::scratch::ScratchArea;
use super::synthesizer::ChunkSynthesizer;
use super::types::{AudioChunk, NarrationJob};
use crate::defaults;
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Ordered list of segment files in a scratch directory.
///
/// Backed by an ffmpeg concat list on disk. An entry is only appended after
/// its segment has been written and synced.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    dir: PathBuf,
    path: PathBuf,
    entries: Vec<String>,
}

impl Manifest {
    /// Start an empty manifest in `dir`.
    pub async fn create(dir: &Path) -> Result<Self> {
        let path = dir.join(defaults::MANIFEST_FILE_NAME);
        File::create(&path).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
            path,
            entries: Vec::new(),
        })
    }

    pub async fn append(&mut self, file_name: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        let line = format!("{}\n", concat_line(file_name));
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        self.entries.push(file_name.to_string());
        Ok(())
    }

    /// Segment file names in concatenation order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn segment_paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| self.dir.join(e)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Location of the concat list file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `file '<name>'` with single quotes escaped for the concat demuxer.
fn concat_line(file_name: &str) -> String {
    format!("file '{}'", file_name.replace('\'', r"'\''"))
}

/// `<zero-padded sequence>_<base>.<ext>`
pub fn segment_file_name(sequence_number: u32, base_name: &str, extension: &str) -> String {
    format!(
        "{:0width$}_{}.{}",
        sequence_number,
        base_name,
        extension,
        width = defaults::SEQUENCE_WIDTH
    )
}

/// Turns a job's text chunks into numbered segment files.
///
/// The sequence counter starts at 1 and keeps counting across every job
/// run through the same sequencer.
#[derive(Debug)]
pub struct ChunkSequencer {
    next_sequence: u32,
    show_progress: bool,
}

impl Default for ChunkSequencer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ChunkSequencer {
    pub fn new(show_progress: bool) -> Self {
        Self {
            next_sequence: 1,
            show_progress,
        }
    }

    /// Sequence number the next segment will get.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Synthesize every non-blank chunk of `job` into `scratch`.
    ///
    /// Stops at the first permanent synthesis error. Files written before
    /// the error stay in `scratch`; their fate is up to the scratch area.
    pub async fn run(
        &mut self,
        job: &NarrationJob,
        synthesizer: &ChunkSynthesizer,
        budget: &mut RateBudgetTracker,
        scratch: &ScratchArea,
    ) -> Result<Manifest> {
        let mut manifest = Manifest::create(scratch.path()).await?;
        let base_name = job.base_name();
        let progress = self.progress_bar(job);

        for (index, chunk) in job.chunks.iter().enumerate() {
            progress.inc(1);
            let text = chunk.trim();
            if text.is_empty() {
                continue;
            }

            tracing::debug!(
                chunk = index + 1,
                total = job.chunks.len(),
                label = %job.label,
                "Synthesizing chunk"
            );
            let payload = match synthesizer.synthesize(budget, text).await {
                Ok(payload) => payload,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };

            let audio = AudioChunk {
                sequence_number: self.next_sequence,
                payload,
                encoding: synthesizer.encoding(),
            };
            let file_name = persist(&audio, scratch.path(), &base_name).await?;
            manifest.append(&file_name).await?;
            self.next_sequence += 1;
        }

        progress.finish();
        Ok(manifest)
    }

    fn progress_bar(&self, job: &NarrationJob) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(job.chunks.len() as u64);
        pb.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template("{msg:30!} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        pb.set_message(job.label.clone());
        pb
    }
}

/// Write one segment and make sure it is on disk before it is listed.
async fn persist(audio: &AudioChunk, dir: &Path, base_name: &str) -> Result<String> {
    let file_name = segment_file_name(
        audio.sequence_number,
        base_name,
        audio.encoding.extension(),
    );
    let mut file = File::create(dir.join(&file_name)).await?;
    file.write_all(&audio.payload).await?;
    file.sync_all().await?;
    Ok(file_name)
}

/// Read a concat list back into file names.
pub fn read_manifest_entries(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .filter_map(|line| line.strip_prefix("file '")?.strip_suffix('\'').map(|s| s.replace(r"'\''", "'")))
        .collect())
}
