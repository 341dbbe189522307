//! One job from text chunks to a tagged file.

use super::assembler::{Assembler, AssemblyOutcome};
use super::rate::RateBudgetTracker;
use super::scratch::ScratchArea;
use super::sequencer::ChunkSequencer;
use super::synthesizer::ChunkSynthesizer;
use super::tagger::{MetadataTagger, TagOutcome};
use super::types::{NarrationJob, TrackMetadata};
use crate::error::Result;
use std::path::PathBuf;

/// Where scratch areas live and what happens to them on failure.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scratch_root: PathBuf,
    pub keep_scratch_on_failure: bool,
    pub show_progress: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
            keep_scratch_on_failure: false,
            show_progress: false,
        }
    }
}

/// Result of the best-effort tagging step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStatus {
    Applied { cover_embedded: bool },
    Unsupported,
    /// Tagging failed; the audio file itself is complete.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationOutcome {
    Completed {
        destination: PathBuf,
        segments: usize,
        tags: TagStatus,
    },
    /// Every chunk was blank; no file was written.
    NothingToNarrate,
}

/// Sequencer, assembler and tagger wired together.
///
/// The sequence counter lives as long as the pipeline, so segment numbers
/// keep increasing across the jobs it runs. The rate budget is passed in
/// per call and may be shared by several pipelines run one after another.
pub struct NarrationPipeline {
    synthesizer: ChunkSynthesizer,
    sequencer: ChunkSequencer,
    assembler: Assembler,
    tagger: MetadataTagger,
    settings: PipelineSettings,
}

impl NarrationPipeline {
    pub fn new(synthesizer: ChunkSynthesizer, assembler: Assembler, settings: PipelineSettings) -> Self {
        Self {
            synthesizer,
            sequencer: ChunkSequencer::new(settings.show_progress),
            assembler,
            tagger: MetadataTagger::new(),
            settings,
        }
    }

    /// Narrate `job` into `job.destination` and tag it with `metadata`.
    ///
    /// Synthesis and assembly errors abort the job and are returned; nothing
    /// is written to the destination in that case. Tagging errors are
    /// logged and reported in the outcome.
    pub async fn narrate(
        &mut self,
        budget: &mut RateBudgetTracker,
        job: &NarrationJob,
        metadata: &TrackMetadata,
    ) -> Result<NarrationOutcome> {
        tracing::info!(
            label = %job.label,
            chunks = job.speakable_chunks(),
            destination = %job.destination.display(),
            "Narrating"
        );

        let scratch = ScratchArea::create(
            &self.settings.scratch_root,
            self.settings.keep_scratch_on_failure,
        )?;
        let manifest = self
            .sequencer
            .run(job, &self.synthesizer, budget, &scratch)
            .await?;

        let assembled = self
            .assembler
            .assemble(
                scratch,
                &manifest,
                &job.destination,
                job.format,
                self.synthesizer.encoding(),
            )
            .await?;

        let (destination, segments) = match assembled {
            AssemblyOutcome::NothingToAssemble => return Ok(NarrationOutcome::NothingToNarrate),
            AssemblyOutcome::Assembled {
                destination,
                segments,
            } => (destination, segments),
        };

        let tags = match self.tagger.tag(&destination, job.format, metadata) {
            Ok(TagOutcome::Applied { cover_embedded }) => TagStatus::Applied { cover_embedded },
            Ok(TagOutcome::Unsupported { .. }) => TagStatus::Unsupported,
            Err(e) => {
                tracing::warn!(path = %destination.display(), "Tagging failed: {e}");
                TagStatus::Failed(e.to_string())
            }
        };

        Ok(NarrationOutcome::Completed {
            destination,
            segments,
            tags,
        })
    }
}
