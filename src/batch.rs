//! Narrating a whole book, one job per chapter.

use crate::document::Book;
use crate::narration::pipeline::{NarrationOutcome, NarrationPipeline, TagStatus};
use crate::narration::rate::RateBudgetTracker;
use crate::narration::types::{NarrationJob, OutputFormat, TrackMetadata};
use std::path::{Path, PathBuf};

/// Replace characters that are unsafe in file names with look-alikes.
///
/// `?` is dropped, straight double quotes become alternating curly quotes
/// and a single trailing period is removed.
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = String::with_capacity(title.len());
    let mut open_quote = true;
    for c in title.chars() {
        match c {
            '?' => {}
            '"' => {
                sanitized.push(if open_quote { '“' } else { '”' });
                open_quote = !open_quote;
            }
            '#' => sanitized.push('﹟'),
            '\'' => sanitized.push('ʼ'),
            ':' => sanitized.push('꞉'),
            '*' => sanitized.push('⋆'),
            '|' => sanitized.push('┃'),
            '/' => sanitized.push('⁄'),
            '\\' => sanitized.push('﹨'),
            '<' => sanitized.push('＜'),
            '>' => sanitized.push('＞'),
            other => sanitized.push(other),
        }
    }
    let trimmed = sanitized.trim();
    trimmed.strip_suffix('.').unwrap_or(trimmed).trim().to_string()
}

/// `<out_dir>/<book>_<NNN>_<title>.<ext>`, numbered from 1.
pub fn chapter_destination(
    out_dir: &Path,
    book_title: &str,
    number: usize,
    chapter_title: &str,
    format: OutputFormat,
) -> PathBuf {
    let mut title = sanitize_title(chapter_title);
    if title.is_empty() {
        title = format!("Chapter {number}");
    }
    out_dir.join(format!(
        "{}_{:03}_{}.{}",
        sanitize_title(book_title),
        number,
        title,
        format.extension()
    ))
}

/// A cover image named after the input file: `<stem>.jpg`, then `<stem>.png`.
pub fn find_cover(input: &Path) -> Option<PathBuf> {
    ["jpg", "png"]
        .iter()
        .map(|ext| input.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Characters that would be sent for chapters not yet narrated.
pub fn pending_characters(book: &Book, options: &BatchOptions) -> usize {
    book.chapters
        .iter()
        .enumerate()
        .filter(|(i, _)| !options.destination_for(book, *i).exists())
        .map(|(_, chapter)| chapter.characters())
        .sum()
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    pub author: String,
    /// Album tag; the book title when unset.
    pub album_title: Option<String>,
    pub genre: String,
    pub cover_image: Option<PathBuf>,
}

impl BatchOptions {
    fn destination_for(&self, book: &Book, index: usize) -> PathBuf {
        chapter_destination(
            &self.out_dir,
            &book.title,
            index + 1,
            &book.chapters[index].title,
            self.format,
        )
    }
}

/// What happened to each chapter of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub narrated: Vec<PathBuf>,
    /// Destination already existed.
    pub skipped: Vec<PathBuf>,
    /// Chapters with no speakable text.
    pub empty: Vec<String>,
    /// Chapter title and error message.
    pub failed: Vec<(String, String)>,
    /// Files that were written but could not be tagged.
    pub untagged: Vec<PathBuf>,
    pub characters_sent: u64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Narrate every chapter of `book` in order.
///
/// Chapters whose destination already exists are skipped without any
/// synthesis, so an interrupted run can be resumed. A chapter that fails is
/// recorded and the batch moves on to the next one.
pub async fn run_batch(
    pipeline: &mut NarrationPipeline,
    budget: &mut RateBudgetTracker,
    book: &Book,
    options: &BatchOptions,
) -> BatchReport {
    let mut report = BatchReport::default();
    let characters_before = budget.total_characters();
    let album_title = options
        .album_title
        .clone()
        .unwrap_or_else(|| book.title.clone());

    for (index, chapter) in book.chapters.iter().enumerate() {
        let destination = options.destination_for(book, index);
        if destination.exists() {
            tracing::info!(path = %destination.display(), "Already narrated, skipping");
            report.skipped.push(destination);
            continue;
        }

        let job = NarrationJob::new(&chapter.title, chapter.chunks.clone(), &destination, options.format);
        let metadata = TrackMetadata {
            author: options.author.clone(),
            album_title: album_title.clone(),
            title: chapter.title.clone(),
            track_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
            genre: options.genre.clone(),
            cover_image: options.cover_image.clone(),
        };

        match pipeline.narrate(budget, &job, &metadata).await {
            Ok(NarrationOutcome::Completed {
                destination, tags, ..
            }) => {
                if matches!(tags, TagStatus::Failed(_)) {
                    report.untagged.push(destination.clone());
                }
                report.narrated.push(destination);
            }
            Ok(NarrationOutcome::NothingToNarrate) => {
                tracing::info!(chapter = %chapter.title, "Chapter has no text, nothing written");
                report.empty.push(chapter.title.clone());
            }
            Err(e) => {
                tracing::error!(chapter = %chapter.title, "Chapter failed: {e}");
                report.failed.push((chapter.title.clone(), e.to_string()));
            }
        }
    }

    report.characters_sent = budget.total_characters() - characters_before;
    report
}
