//! Default configuration constants for narrator.
//!
//! Shared by the config types, the pipeline and the CLI so every default
//! has exactly one definition.

/// Maximum synthesis requests admitted per wall-clock minute.
///
/// Matches the provider's published per-project quota for standard voices.
pub const MAX_REQUESTS_PER_MINUTE: u32 = 200;

/// Maximum characters sent to the provider per wall-clock minute.
pub const MAX_CHARACTERS_PER_MINUTE: u64 = 135_000;

/// Seconds between checks while the rate budget is exhausted.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Default voice name.
pub const DEFAULT_VOICE: &str = "en-US-Wavenet-D";

/// Default BCP-47 language code for the voice.
pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Base URL of the Google Cloud Text-to-Speech REST API.
pub const GOOGLE_TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com";

/// Seconds allowed for the TCP and TLS handshake with the provider.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Seconds allowed for one synthesis request, response body included.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Largest chunk (in UTF-8 bytes) handed to the provider.
///
/// The provider rejects inputs above 5000 bytes; keep some headroom.
pub const MAX_CHUNK_BYTES: usize = 4800;

/// Name of the ffmpeg concat list written into each scratch directory.
pub const MANIFEST_FILE_NAME: &str = "ffmpeg_file_list.txt";

/// Width of the zero-padded sequence number in segment file names.
pub const SEQUENCE_WIDTH: usize = 5;

/// Prefix of per-job scratch directories.
pub const SCRATCH_PREFIX: &str = "narrator-";

/// Default ffmpeg executable.
pub const FFMPEG: &str = "ffmpeg";

/// Genre written to every tagged file.
pub const DEFAULT_GENRE: &str = "Audiobook";

/// Author used when neither the CLI nor the config names one.
pub const DEFAULT_AUTHOR: &str = "Unknown";

/// First retry delay for transient provider errors, in milliseconds.
pub const RETRY_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound for a single retry delay, in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Language prefix used by `narrator voices` when none is given.
pub const DEFAULT_VOICE_LANGUAGE: &str = "en";
