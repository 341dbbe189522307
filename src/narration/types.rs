//! Data types shared by the narration stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Audio encoding requested from the synthesis provider.
///
/// This is the format of the intermediate segments in the scratch area,
/// not the format of the finished file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    #[default]
    OggOpus,
    Mp3,
    Linear16,
}

impl AudioEncoding {
    /// Name used by the provider API.
    pub fn api_name(self) -> &'static str {
        match self {
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }

    /// File extension for scratch segments.
    pub fn extension(self) -> &'static str {
        match self {
            AudioEncoding::OggOpus => "opus",
            AudioEncoding::Mp3 => "mp3",
            // LINEAR16 responses carry a RIFF header
            AudioEncoding::Linear16 => "wav",
        }
    }
}

/// Container/codec of the finished chapter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Lossless, re-encoded by ffmpeg. Supports tagging.
    #[default]
    Flac,
    /// Ogg Opus. Stream-copied when the segments already are Ogg Opus.
    /// Tagging is not supported.
    Opus,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Flac => "flac",
            OutputFormat::Opus => "opus",
        }
    }

    /// ffmpeg codec arguments for muxing segments of `source` encoding.
    pub fn codec_args(self, source: AudioEncoding) -> Vec<String> {
        let args: &[&str] = match (self, source) {
            (OutputFormat::Flac, _) => &["-c:a", "flac"],
            (OutputFormat::Opus, AudioEncoding::OggOpus) => &["-c", "copy"],
            (OutputFormat::Opus, _) => &["-c:a", "libopus"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Whether [`MetadataTagger`](crate::narration::tagger::MetadataTagger)
    /// can write tags into this container.
    pub fn supports_tags(self) -> bool {
        matches!(self, OutputFormat::Flac)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flac" => Ok(OutputFormat::Flac),
            "opus" | "ogg" => Ok(OutputFormat::Opus),
            other => Err(format!("unknown output format '{other}' (expected flac or opus)")),
        }
    }
}

/// Voice used for synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
}

impl VoiceSelection {
    pub fn new(language_code: &str, name: &str) -> Self {
        Self {
            language_code: language_code.to_string(),
            name: name.to_string(),
        }
    }

    /// Derive the language code from a voice name like `en-US-Wavenet-D`.
    pub fn from_name(name: &str) -> Self {
        let language_code = name.splitn(3, '-').take(2).collect::<Vec<_>>().join("-");
        Self::new(&language_code, name)
    }
}

/// One logical unit of narration, typically a chapter.
#[derive(Debug, Clone)]
pub struct NarrationJob {
    /// Human-readable label shown in progress output.
    pub label: String,
    /// Text chunks in narration order. Blank chunks are skipped.
    pub chunks: Vec<String>,
    pub destination: PathBuf,
    pub format: OutputFormat,
}

impl NarrationJob {
    pub fn new(label: &str, chunks: Vec<String>, destination: &Path, format: OutputFormat) -> Self {
        Self {
            label: label.to_string(),
            chunks,
            destination: destination.to_path_buf(),
            format,
        }
    }

    /// Base name used for scratch segment files.
    pub fn base_name(&self) -> String {
        self.destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk".to_string())
    }

    /// Number of chunks that will actually be synthesized.
    pub fn speakable_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| !c.trim().is_empty()).count()
    }
}

/// Synthesized audio for one text chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub sequence_number: u32,
    pub payload: Vec<u8>,
    pub encoding: AudioEncoding,
}

/// Descriptive tags for one finished file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub author: String,
    pub album_title: String,
    pub title: String,
    pub track_number: u32,
    pub genre: String,
    pub cover_image: Option<PathBuf>,
}
