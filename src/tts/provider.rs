use crate::narration::types::{AudioEncoding, VoiceSelection};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Failure reported by a synthesis provider.
///
/// Transient errors are expected to succeed when the same request is sent
/// again; permanent errors will not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("permanent provider error: {0}")]
    Permanent(String),
}

impl SynthesisError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SynthesisError::Transient(_))
    }
}

/// One synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    pub voice: &'a VoiceSelection,
    pub encoding: AudioEncoding,
}

/// Entry of the provider's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub language_codes: Vec<String>,
    pub gender: Option<String>,
    pub natural_sample_rate_hertz: Option<u32>,
}

/// Remote text-to-speech capability.
///
/// This trait allows swapping implementations (real provider vs mock).
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Turn `request.text` into audio bytes in `request.encoding`.
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, SynthesisError>;

    /// Voices whose name starts with `language_prefix`, sorted by name.
    async fn list_voices(&self, language_prefix: &str) -> Result<Vec<VoiceInfo>, SynthesisError>;

    /// Provider name for logs and error messages.
    fn name(&self) -> &str;
}

/// Scripted reply of a [`MockProvider`].
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return the configured fallback audio (or the text bytes).
    Audio,
    /// Return these bytes.
    Bytes(Vec<u8>),
    Transient(String),
    Permanent(String),
}

/// Mock provider for testing.
///
/// Replies are consumed in order; once the script is exhausted every call
/// succeeds. Successful calls return the fallback audio if one is set,
/// otherwise the UTF-8 bytes of the request text.
#[derive(Debug, Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<String>>,
    fallback_audio: Option<Vec<u8>>,
    voices: Vec<VoiceInfo>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these bytes for every successful call.
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.fallback_audio = Some(audio);
        self
    }

    pub fn then(self, reply: MockReply) -> Self {
        self.lock_script().push_back(reply);
        self
    }

    pub fn then_audio(self) -> Self {
        self.then(MockReply::Audio)
    }

    pub fn then_transient(self, message: &str) -> Self {
        self.then(MockReply::Transient(message.to_string()))
    }

    pub fn then_permanent(self, message: &str) -> Self {
        self.then(MockReply::Permanent(message.to_string()))
    }

    pub fn with_voices(mut self, names: &[&str]) -> Self {
        self.voices = names
            .iter()
            .map(|name| VoiceInfo {
                name: name.to_string(),
                language_codes: vec![VoiceSelection::from_name(name).language_code],
                gender: None,
                natural_sample_rate_hertz: None,
            })
            .collect();
        self
    }

    /// Texts of every call that reached the provider, including failures.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SpeechProvider for MockProvider {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, SynthesisError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.text.to_string());
        }

        let reply = self.lock_script().pop_front().unwrap_or(MockReply::Audio);
        match reply {
            MockReply::Audio => Ok(self
                .fallback_audio
                .clone()
                .unwrap_or_else(|| request.text.as_bytes().to_vec())),
            MockReply::Bytes(bytes) => Ok(bytes),
            MockReply::Transient(message) => Err(SynthesisError::Transient(message)),
            MockReply::Permanent(message) => Err(SynthesisError::Permanent(message)),
        }
    }

    async fn list_voices(&self, language_prefix: &str) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let mut voices: Vec<VoiceInfo> = self
            .voices
            .iter()
            .filter(|v| v.name.starts_with(language_prefix))
            .cloned()
            .collect();
        voices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(voices)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(text: &'a str, voice: &'a VoiceSelection) -> SynthesisRequest<'a> {
        SynthesisRequest {
            text,
            voice,
            encoding: AudioEncoding::OggOpus,
        }
    }

    #[tokio::test]
    async fn mock_echoes_text_by_default() {
        let voice = VoiceSelection::from_name("en-US-Wavenet-D");
        let provider = MockProvider::new();

        let audio = provider.synthesize(&request("Hello.", &voice)).await.unwrap();

        assert_eq!(audio, b"Hello.");
        assert_eq!(provider.requests(), vec!["Hello."]);
    }

    #[tokio::test]
    async fn mock_follows_script_then_succeeds() {
        let voice = VoiceSelection::from_name("en-US-Wavenet-D");
        let provider = MockProvider::new()
            .with_audio(vec![1, 2, 3])
            .then_transient("500")
            .then_permanent("400");

        let first = provider.synthesize(&request("a", &voice)).await;
        let second = provider.synthesize(&request("b", &voice)).await;
        let third = provider.synthesize(&request("c", &voice)).await;

        assert_eq!(first, Err(SynthesisError::Transient("500".to_string())));
        assert_eq!(second, Err(SynthesisError::Permanent("400".to_string())));
        assert_eq!(third, Ok(vec![1, 2, 3]));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_filters_voices_by_prefix() {
        let provider =
            MockProvider::new().with_voices(&["en-US-Wavenet-D", "de-DE-Wavenet-A", "en-GB-News-K"]);

        let voices = provider.list_voices("en").await.unwrap();
        let names: Vec<_> = voices.iter().map(|v| v.name.as_str()).collect();

        assert_eq!(names, vec!["en-GB-News-K", "en-US-Wavenet-D"]);
        assert_eq!(voices[0].language_codes, vec!["en-GB"]);
    }

    #[test]
    fn transient_classification() {
        assert!(SynthesisError::Transient("x".into()).is_transient());
        assert!(!SynthesisError::Permanent("x".into()).is_transient());
    }

    #[test]
    fn provider_trait_is_object_safe() {
        let provider: Box<dyn SpeechProvider> = Box::new(MockProvider::new());
        assert_eq!(provider.name(), "mock");
    }
}
