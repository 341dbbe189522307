//! One text chunk in, audio bytes out.

use super::rate::{Clock, RateBudgetTracker, SystemClock};
use super::retry::RetryPolicy;
use super::types::{AudioEncoding, VoiceSelection};
use crate::error::{NarratorError, Result};
use crate::tts::{SpeechProvider, SynthesisError, SynthesisRequest};
use std::sync::Arc;

/// Calls the provider for a single chunk, gated by the rate budget.
///
/// Transient provider errors are retried without limit, waiting as long as
/// the [`RetryPolicy`] says between attempts. Permanent errors are returned.
pub struct ChunkSynthesizer {
    provider: Arc<dyn SpeechProvider>,
    voice: VoiceSelection,
    encoding: AudioEncoding,
    retry: Box<dyn RetryPolicy>,
    clock: Arc<dyn Clock>,
}

impl ChunkSynthesizer {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        voice: VoiceSelection,
        encoding: AudioEncoding,
        retry: Box<dyn RetryPolicy>,
    ) -> Self {
        Self {
            provider,
            voice,
            encoding,
            retry,
            clock: Arc::new(SystemClock),
        }
    }

    /// Wait out retry delays on `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn encoding(&self) -> AudioEncoding {
        self.encoding
    }

    pub fn voice(&self) -> &VoiceSelection {
        &self.voice
    }

    /// Synthesize `text`, which must be non-empty and within the provider's
    /// input limit.
    ///
    /// Every attempt is admitted by `budget`; only the successful one is
    /// recorded against it.
    pub async fn synthesize(&self, budget: &mut RateBudgetTracker, text: &str) -> Result<Vec<u8>> {
        let characters = text.chars().count();
        let request = SynthesisRequest {
            text,
            voice: &self.voice,
            encoding: self.encoding,
        };

        let mut failures: u32 = 0;
        loop {
            budget.admit(characters).await;

            match self.provider.synthesize(&request).await {
                Ok(audio) => {
                    budget.record(characters);
                    if failures > 0 {
                        tracing::debug!(attempts = failures + 1, "Chunk synthesized after retries");
                    }
                    return Ok(audio);
                }
                Err(SynthesisError::Transient(message)) => {
                    failures += 1;
                    let delay = self.retry.delay_for(failures);
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "Transient synthesis error, retrying: {message}"
                    );
                    if !delay.is_zero() {
                        self.clock.sleep(delay).await;
                    }
                }
                Err(SynthesisError::Permanent(message)) => {
                    return Err(NarratorError::Synthesis {
                        message: format!("{}: {}", self.provider.name(), message),
                    });
                }
            }
        }
    }
}
