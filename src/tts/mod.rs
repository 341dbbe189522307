//! Speech synthesis providers.

pub mod google;
pub mod provider;

pub use google::{GoogleAuth, GoogleTtsProvider, HttpTimeouts};
pub use provider::{
    MockProvider, MockReply, SpeechProvider, SynthesisError, SynthesisRequest, VoiceInfo,
};
