//! Google Cloud Text-to-Speech over its REST API.
//!
//! Speaks `v1/text:synthesize` and `v1/voices`. Authentication is either an
//! API key or an OAuth access token obtained out of band
//! (e.g. `gcloud auth print-access-token`).

use super::provider::{SpeechProvider, SynthesisError, SynthesisRequest, VoiceInfo};
use crate::defaults;
use crate::error::NarratorError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub enum GoogleAuth {
    ApiKey(String),
    AccessToken(String),
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleAuth::ApiKey(_) => f.write_str("ApiKey(***)"),
            GoogleAuth::AccessToken(_) => f.write_str("AccessToken(***)"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody<'a> {
    input: TextInput<'a>,
    voice: VoiceParams<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceParams<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<RawVoice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVoice {
    name: String,
    #[serde(default)]
    language_codes: Vec<String>,
    ssml_gender: Option<String>,
    natural_sample_rate_hertz: Option<u32>,
}

/// Limits after which a stalled request fails as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS),
            request: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Google Cloud Text-to-Speech client.
#[derive(Debug, Clone)]
pub struct GoogleTtsProvider {
    client: reqwest::Client,
    endpoint: String,
    auth: GoogleAuth,
}

impl GoogleTtsProvider {
    pub fn new(auth: GoogleAuth) -> crate::Result<Self> {
        Self::with_endpoint(defaults::GOOGLE_TTS_ENDPOINT, auth, HttpTimeouts::default())
    }

    pub fn with_endpoint(endpoint: &str, auth: GoogleAuth, timeouts: HttpTimeouts) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(|e| NarratorError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoint, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            GoogleAuth::ApiKey(key) => request.header("X-Goog-Api-Key", key),
            GoogleAuth::AccessToken(token) => request.bearer_auth(token),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, SynthesisError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl SpeechProvider for GoogleTtsProvider {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<Vec<u8>, SynthesisError> {
        let body = SynthesizeBody {
            input: TextInput { text: request.text },
            voice: VoiceParams {
                language_code: &request.voice.language_code,
                name: &request.voice.name,
            },
            audio_config: AudioConfig {
                audio_encoding: request.encoding.api_name(),
            },
        };

        let text = self
            .send(self.client.post(self.url("text:synthesize")).json(&body))
            .await?;
        decode_audio(&text)
    }

    async fn list_voices(&self, language_prefix: &str) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let text = self.send(self.client.get(self.url("voices"))).await?;
        parse_voices(&text, language_prefix)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Map an HTTP error status to a retry classification.
///
/// Throttling and server-side failures are transient; request, auth and
/// quota errors are permanent.
fn classify_status(status: StatusCode, body: &str) -> SynthesisError {
    let message = format!("HTTP {}: {}", status.as_u16(), error_message(body));
    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => SynthesisError::Transient(message),
        _ => SynthesisError::Permanent(message),
    }
}

fn classify_transport_error(error: reqwest::Error) -> SynthesisError {
    if error.is_timeout() || error.is_connect() {
        SynthesisError::Transient(format!("request failed: {error}"))
    } else {
        SynthesisError::Permanent(format!("request failed: {error}"))
    }
}

/// Pull `error.message` out of a Google error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn decode_audio(body: &str) -> Result<Vec<u8>, SynthesisError> {
    let response: SynthesizeResponse = serde_json::from_str(body)
        .map_err(|e| SynthesisError::Permanent(format!("malformed synthesis response: {e}")))?;
    STANDARD
        .decode(response.audio_content.as_bytes())
        .map_err(|e| SynthesisError::Permanent(format!("malformed audio content: {e}")))
}

fn parse_voices(body: &str, language_prefix: &str) -> Result<Vec<VoiceInfo>, SynthesisError> {
    let response: VoicesResponse = serde_json::from_str(body)
        .map_err(|e| SynthesisError::Permanent(format!("malformed voices response: {e}")))?;

    let mut voices: Vec<VoiceInfo> = response
        .voices
        .into_iter()
        .filter(|v| v.name.starts_with(language_prefix))
        .map(|v| VoiceInfo {
            name: v.name,
            language_codes: v.language_codes,
            gender: v.ssml_gender,
            natural_sample_rate_hertz: v.natural_sample_rate_hertz,
        })
        .collect();
    voices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(voices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::types::{AudioEncoding, VoiceSelection};

    #[test]
    fn synthesize_body_matches_api_shape() {
        let voice = VoiceSelection::new("en-US", "en-US-Wavenet-D");
        let body = SynthesizeBody {
            input: TextInput { text: "Hello." },
            voice: VoiceParams {
                language_code: &voice.language_code,
                name: &voice.name,
            },
            audio_config: AudioConfig {
                audio_encoding: AudioEncoding::OggOpus.api_name(),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "input": {"text": "Hello."},
                "voice": {"languageCode": "en-US", "name": "en-US-Wavenet-D"},
                "audioConfig": {"audioEncoding": "OGG_OPUS"}
            })
        );
    }

    #[test]
    fn decode_audio_reads_base64_content() {
        let body = r#"{"audioContent": "T2dnUw=="}"#;
        assert_eq!(decode_audio(body).unwrap(), b"OggS");
    }

    #[test]
    fn decode_audio_rejects_garbage_as_permanent() {
        assert!(matches!(
            decode_audio("not json"),
            Err(SynthesisError::Permanent(_))
        ));
        assert!(matches!(
            decode_audio(r#"{"audioContent": "***"}"#),
            Err(SynthesisError::Permanent(_))
        ));
    }

    #[test]
    fn server_errors_and_throttling_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            assert!(classify_status(status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            assert!(!classify_status(status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn status_message_uses_google_error_message() {
        let body = r#"{"error": {"code": 400, "message": "Invalid voice name", "status": "INVALID_ARGUMENT"}}"#;
        let error = classify_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            error,
            SynthesisError::Permanent("HTTP 400: Invalid voice name".to_string())
        );
    }

    #[test]
    fn parse_voices_filters_and_sorts() {
        let body = r#"{"voices": [
            {"languageCodes": ["en-US"], "name": "en-US-Wavenet-D", "ssmlGender": "MALE", "naturalSampleRateHertz": 24000},
            {"languageCodes": ["de-DE"], "name": "de-DE-Wavenet-A", "ssmlGender": "FEMALE", "naturalSampleRateHertz": 24000},
            {"languageCodes": ["en-GB"], "name": "en-GB-Standard-A", "ssmlGender": "FEMALE", "naturalSampleRateHertz": 24000}
        ]}"#;

        let voices = parse_voices(body, "en").unwrap();
        let names: Vec<_> = voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["en-GB-Standard-A", "en-US-Wavenet-D"]);
        assert_eq!(voices[1].gender.as_deref(), Some("MALE"));
        assert_eq!(voices[1].natural_sample_rate_hertz, Some(24000));
    }

    #[test]
    fn parse_voices_accepts_empty_catalog() {
        assert!(parse_voices("{}", "en").unwrap().is_empty());
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let provider = GoogleTtsProvider::with_endpoint(
            "http://localhost:8080/",
            GoogleAuth::ApiKey("k".to_string()),
            HttpTimeouts::default(),
        )
        .unwrap();
        assert_eq!(
            provider.url("text:synthesize"),
            "http://localhost:8080/v1/text:synthesize"
        );
    }

    #[tokio::test]
    async fn unresponsive_server_times_out_as_transient() {
        // Accepts connections into the backlog but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let provider = GoogleTtsProvider::with_endpoint(
            &endpoint,
            GoogleAuth::ApiKey("k".to_string()),
            HttpTimeouts {
                connect: Duration::from_millis(500),
                request: Duration::from_millis(200),
            },
        )
        .unwrap();
        let voice = VoiceSelection::from_name("en-US-Wavenet-D");
        let request = SynthesisRequest {
            text: "Hello.",
            voice: &voice,
            encoding: AudioEncoding::OggOpus,
        };

        let result = provider.synthesize(&request).await;

        match result {
            Err(error @ SynthesisError::Transient(_)) => assert!(error.is_transient()),
            other => panic!("Expected transient timeout, got {other:?}"),
        }
        drop(listener);
    }

    #[test]
    fn default_timeouts_come_from_defaults() {
        let timeouts = HttpTimeouts::default();
        assert_eq!(timeouts.connect, Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS));
        assert_eq!(timeouts.request, Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn auth_debug_hides_secrets() {
        let auth = GoogleAuth::ApiKey("secret-key".to_string());
        assert!(!format!("{auth:?}").contains("secret-key"));
    }
}
