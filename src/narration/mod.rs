//! The narration pipeline.
//!
//! Text chunks flow through the [`ChunkSynthesizer`] (gated by a
//! [`RateBudgetTracker`]) into numbered segment files, which the
//! [`Assembler`] concatenates into one file per job before the
//! [`MetadataTagger`] finalizes it. Everything runs one chunk at a time.

pub mod assembler;
pub mod pipeline;
pub mod rate;
pub mod retry;
pub mod scratch;
pub mod sequencer;
pub mod synthesizer;
pub mod tagger;
pub mod types;

pub use assembler::{Assembler, AssemblyOutcome};
pub use pipeline::{NarrationOutcome, NarrationPipeline, PipelineSettings, TagStatus};
pub use rate::{AdmissionMode, Clock, ManualClock, RateBudgetTracker, RateLimits, RateWindow, SystemClock};
pub use retry::{ExponentialBackoff, Immediate, RetryPolicy, RetryStrategy};
pub use scratch::ScratchArea;
pub use sequencer::{ChunkSequencer, Manifest};
pub use synthesizer::ChunkSynthesizer;
pub use tagger::{CoverArt, MetadataTagger, TagOutcome};
pub use types::{AudioChunk, AudioEncoding, NarrationJob, OutputFormat, TrackMetadata, VoiceSelection};
