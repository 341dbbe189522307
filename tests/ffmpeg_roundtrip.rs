//! End-to-end assembly with a real ffmpeg.
//!
//! Silent WAV segments of known length go through the pipeline as LINEAR16
//! audio and come out as one FLAC file whose length is their sum.

use narrator::narration::{
    Assembler, AudioEncoding, ChunkSynthesizer, Immediate, NarrationJob, NarrationOutcome, NarrationPipeline,
    OutputFormat, PipelineSettings, RateBudgetTracker, RateLimits, TagStatus, TrackMetadata, VoiceSelection,
};
use narrator::tts::{MockProvider, MockReply};
use narrator::{CommandExecutor, SystemCommandExecutor};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SAMPLE_RATE: u32 = 16_000;

async fn ffmpeg_available() -> bool {
    let found = SystemCommandExecutor::new()
        .execute("ffmpeg", &["-version".to_string()])
        .await
        .is_ok();
    if !found {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║  FFMPEG NOT FOUND - SKIPPING ASSEMBLY ROUND-TRIP TESTS       ║");
        eprintln!("║                                                              ║");
        eprintln!("║  Install it with:                                            ║");
        eprintln!("║    sudo apt install ffmpeg                                   ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
    }
    found
}

fn silent_wav(samples: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

fn pipeline(provider: Arc<MockProvider>, scratch_root: &Path) -> NarrationPipeline {
    NarrationPipeline::new(
        ChunkSynthesizer::new(
            provider,
            VoiceSelection::from_name("en-US-Wavenet-D"),
            AudioEncoding::Linear16,
            Box::new(Immediate),
        ),
        Assembler::new(Arc::new(SystemCommandExecutor::new()), "ffmpeg"),
        PipelineSettings {
            scratch_root: scratch_root.to_path_buf(),
            ..PipelineSettings::default()
        },
    )
}

fn metadata(cover: Option<PathBuf>) -> TrackMetadata {
    TrackMetadata {
        author: "Test Author".to_string(),
        album_title: "Silence".to_string(),
        title: "Quiet Chapter".to_string(),
        track_number: 1,
        genre: "Audiobook".to_string(),
        cover_image: cover,
    }
}

/// Narrate one job whose chunks synthesize to silence of the given lengths.
async fn narrate_silence(segment_samples: &[u32], cover: Option<PathBuf>) -> (tempfile::TempDir, NarrationJob, NarrationOutcome) {
    let dir = tempfile::tempdir().unwrap();
    let mut provider = MockProvider::new();
    for &samples in segment_samples {
        provider = provider.then(MockReply::Bytes(silent_wav(samples)));
    }
    let chunks: Vec<String> = (0..segment_samples.len()).map(|i| format!("Chunk {i}.")).collect();
    let job = NarrationJob::new(
        "Quiet Chapter",
        chunks,
        &dir.path().join("out").join("silence_001_Quiet Chapter.flac"),
        OutputFormat::Flac,
    );
    let mut budget = RateBudgetTracker::new(RateLimits::default());

    let outcome = pipeline(Arc::new(provider), &dir.path().join("scratch"))
        .narrate(&mut budget, &job, &metadata(cover))
        .await
        .unwrap();
    (dir, job, outcome)
}

fn flac_samples(path: &Path) -> (u64, u32) {
    let tag = metaflac::Tag::read_from_path(path).unwrap();
    let info = tag.get_streaminfo().unwrap();
    (info.total_samples, info.sample_rate)
}

#[tokio::test]
async fn three_segments_sum_to_total_duration() {
    if !ffmpeg_available().await {
        return;
    }
    let segments = [8_000, 16_000, 4_000];

    let (_dir, job, outcome) = narrate_silence(&segments, None).await;

    match outcome {
        NarrationOutcome::Completed { segments: n, tags, .. } => {
            assert_eq!(n, 3);
            assert_eq!(tags, TagStatus::Applied { cover_embedded: false });
        }
        other => panic!("Expected completed job, got {other:?}"),
    }
    let (total, rate) = flac_samples(&job.destination);
    assert_eq!(rate, SAMPLE_RATE);
    let expected: u64 = segments.iter().map(|&s| u64::from(s)).sum();
    // Allow one 10 ms frame of slack
    assert!(
        total.abs_diff(expected) <= u64::from(SAMPLE_RATE / 100),
        "expected ~{expected} samples, got {total}"
    );
}

#[tokio::test]
async fn single_segment_round_trips() {
    if !ffmpeg_available().await {
        return;
    }

    let (_dir, job, outcome) = narrate_silence(&[12_000], None).await;

    assert!(matches!(outcome, NarrationOutcome::Completed { segments: 1, .. }));
    let (total, _) = flac_samples(&job.destination);
    assert!(total.abs_diff(12_000) <= u64::from(SAMPLE_RATE / 100));
}

#[tokio::test]
async fn no_segments_produce_no_file() {
    if !ffmpeg_available().await {
        return;
    }

    let (dir, job, outcome) = narrate_silence(&[], None).await;

    assert_eq!(outcome, NarrationOutcome::NothingToNarrate);
    assert!(!job.destination.exists());
    assert_eq!(std::fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
}

#[tokio::test]
async fn output_directory_holds_only_the_result() {
    if !ffmpeg_available().await {
        return;
    }

    let (dir, job, _) = narrate_silence(&[4_000, 4_000], None).await;

    let names: Vec<String> = std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![job.destination.file_name().unwrap().to_string_lossy().into_owned()]);
    assert_eq!(std::fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
}

#[tokio::test]
async fn cover_dimensions_come_from_the_image() {
    if !ffmpeg_available().await {
        return;
    }
    let images = tempfile::tempdir().unwrap();
    let cover = images.path().join("cover.png");
    image::RgbImage::new(3, 2).save(&cover).unwrap();

    let (_dir, job, outcome) = narrate_silence(&[4_000], Some(cover)).await;

    assert!(matches!(
        outcome,
        NarrationOutcome::Completed {
            tags: TagStatus::Applied { cover_embedded: true },
            ..
        }
    ));
    let tag = metaflac::Tag::read_from_path(&job.destination).unwrap();
    let picture = tag.pictures().next().unwrap();
    assert_eq!((picture.width, picture.height), (3, 2));
    assert_eq!(picture.mime_type, "image/png");
    assert_eq!(
        tag.get_vorbis("TITLE").and_then(|mut v| v.next()),
        Some("Quiet Chapter")
    );
}
