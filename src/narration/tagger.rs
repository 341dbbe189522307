//! Writes descriptive tags onto a finished chapter file.
//!
//! Only FLAC is supported: Vorbis comments for the text fields plus a
//! front-cover picture block. Ogg Opus output is reported as
//! [`TagOutcome::Unsupported`] and left untouched.

use super::types::{OutputFormat, TrackMetadata};
use crate::error::{NarratorError, Result};
use image::{GenericImageView, ImageReader};
use metaflac::block::{Block, Picture, PictureType};
use std::path::Path;

/// Cover image prepared for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// Bits per pixel.
    pub depth: u32,
    pub data: Vec<u8>,
}

impl CoverArt {
    /// Read an image file, taking MIME type and dimensions from its content
    /// rather than its extension.
    pub fn load(path: &Path) -> Result<Self> {
        let cover_error = |message: String| NarratorError::Tagging {
            path: path.display().to_string(),
            message,
        };

        let reader = ImageReader::open(path)?
            .with_guessed_format()
            .map_err(|e| cover_error(format!("cannot read cover image: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| cover_error("unrecognized cover image format".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| cover_error(format!("cannot decode cover image: {e}")))?;
        let (width, height) = image.dimensions();

        Ok(Self {
            mime_type: format.to_mime_type().to_string(),
            width,
            height,
            depth: u32::from(image.color().bits_per_pixel()),
            data: std::fs::read(path)?,
        })
    }

    fn into_picture(self) -> Picture {
        let mut picture = Picture::new();
        picture.picture_type = PictureType::CoverFront;
        picture.mime_type = self.mime_type;
        picture.width = self.width;
        picture.height = self.height;
        picture.depth = self.depth;
        picture.data = self.data;
        picture
    }
}

/// What the tagger did with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    Applied { cover_embedded: bool },
    /// The container has no tag support here; the file was not touched.
    Unsupported { format: OutputFormat },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataTagger;

impl MetadataTagger {
    pub fn new() -> Self {
        Self
    }

    /// Apply `metadata` to the file at `destination`.
    ///
    /// Existing values of the written fields and any existing front cover
    /// are replaced.
    pub fn tag(
        &self,
        destination: &Path,
        format: OutputFormat,
        metadata: &TrackMetadata,
    ) -> Result<TagOutcome> {
        if !format.supports_tags() {
            tracing::info!(
                path = %destination.display(),
                %format,
                "Tagging is not supported for this format, leaving file untagged"
            );
            return Ok(TagOutcome::Unsupported { format });
        }

        let tag_error = |e: metaflac::Error| NarratorError::Tagging {
            path: destination.display().to_string(),
            message: e.to_string(),
        };

        // Load the cover first so a bad image leaves the file unmodified
        let cover = metadata
            .cover_image
            .as_deref()
            .map(CoverArt::load)
            .transpose()?;

        let mut tag = metaflac::Tag::read_from_path(destination).map_err(tag_error)?;
        tag.set_vorbis("ARTIST", vec![metadata.author.clone()]);
        tag.set_vorbis("ALBUM", vec![metadata.album_title.clone()]);
        tag.set_vorbis("TITLE", vec![metadata.title.clone()]);
        tag.set_vorbis("TRACKNUMBER", vec![metadata.track_number.to_string()]);
        tag.set_vorbis("GENRE", vec![metadata.genre.clone()]);

        let cover_embedded = cover.is_some();
        if let Some(cover) = cover {
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_block(Block::Picture(cover.into_picture()));
        }
        tag.save().map_err(tag_error)?;

        tracing::debug!(path = %destination.display(), cover_embedded, "Tagged");
        Ok(TagOutcome::Applied { cover_embedded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// `fLaC` marker plus a lone STREAMINFO block (44.1 kHz, stereo, 16 bit).
    fn minimal_flac(path: &Path) {
        let mut bytes = b"fLaC".to_vec();
        bytes.extend([0x80, 0x00, 0x00, 0x22]);
        bytes.extend([0x10, 0x00, 0x10, 0x00]);
        bytes.extend([0x00; 6]);
        bytes.extend([0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0x00, 0x00]);
        bytes.extend([0x00; 16]);
        std::fs::write(path, bytes).unwrap();
    }

    fn metadata(cover: Option<PathBuf>) -> TrackMetadata {
        TrackMetadata {
            author: "Jane Author".to_string(),
            album_title: "A Long Book".to_string(),
            title: "The Beginning".to_string(),
            track_number: 7,
            genre: "Audiobook".to_string(),
            cover_image: cover,
        }
    }

    fn first_vorbis(tag: &metaflac::Tag, key: &str) -> Option<String> {
        tag.get_vorbis(key)
            .and_then(|mut values| values.next())
            .map(str::to_string)
    }

    #[test]
    fn writes_vorbis_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book_007_The Beginning.flac");
        minimal_flac(&path);

        let outcome = MetadataTagger::new()
            .tag(&path, OutputFormat::Flac, &metadata(None))
            .unwrap();

        assert_eq!(outcome, TagOutcome::Applied { cover_embedded: false });
        let tag = metaflac::Tag::read_from_path(&path).unwrap();
        assert_eq!(first_vorbis(&tag, "ARTIST").as_deref(), Some("Jane Author"));
        assert_eq!(first_vorbis(&tag, "ALBUM").as_deref(), Some("A Long Book"));
        assert_eq!(first_vorbis(&tag, "TITLE").as_deref(), Some("The Beginning"));
        assert_eq!(first_vorbis(&tag, "TRACKNUMBER").as_deref(), Some("7"));
        assert_eq!(first_vorbis(&tag, "GENRE").as_deref(), Some("Audiobook"));
        assert_eq!(tag.pictures().count(), 0);
    }

    #[test]
    fn embeds_cover_with_real_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flac");
        minimal_flac(&path);
        // Misleading extension: the MIME type must come from the content
        let cover = dir.path().join("cover.jpg");
        image::RgbImage::new(3, 2)
            .save_with_format(&cover, image::ImageFormat::Png)
            .unwrap();

        let outcome = MetadataTagger::new()
            .tag(&path, OutputFormat::Flac, &metadata(Some(cover)))
            .unwrap();

        assert_eq!(outcome, TagOutcome::Applied { cover_embedded: true });
        let tag = metaflac::Tag::read_from_path(&path).unwrap();
        let pictures: Vec<_> = tag.pictures().collect();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].picture_type, PictureType::CoverFront);
        assert_eq!(pictures[0].mime_type, "image/png");
        assert_eq!((pictures[0].width, pictures[0].height), (3, 2));
        assert_eq!(pictures[0].depth, 24);
    }

    #[test]
    fn retagging_replaces_values_and_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flac");
        minimal_flac(&path);
        let cover = dir.path().join("cover.png");
        image::RgbImage::new(4, 4).save(&cover).unwrap();
        let tagger = MetadataTagger::new();

        tagger
            .tag(&path, OutputFormat::Flac, &metadata(Some(cover.clone())))
            .unwrap();
        let mut second = metadata(Some(cover));
        second.title = "Renamed".to_string();
        tagger.tag(&path, OutputFormat::Flac, &second).unwrap();

        let tag = metaflac::Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.get_vorbis("TITLE").unwrap().count(), 1);
        assert_eq!(first_vorbis(&tag, "TITLE").as_deref(), Some("Renamed"));
        assert_eq!(tag.pictures().count(), 1);
    }

    #[test]
    fn opus_is_reported_unsupported_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.opus");
        std::fs::write(&path, b"OggS-not-really").unwrap();

        let outcome = MetadataTagger::new()
            .tag(&path, OutputFormat::Opus, &metadata(None))
            .unwrap();

        assert_eq!(
            outcome,
            TagOutcome::Unsupported {
                format: OutputFormat::Opus
            }
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"OggS-not-really");
    }

    #[test]
    fn unreadable_cover_fails_without_touching_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flac");
        minimal_flac(&path);
        let before = std::fs::read(&path).unwrap();
        let cover = dir.path().join("cover.png");
        std::fs::write(&cover, b"definitely not an image").unwrap();

        let result = MetadataTagger::new().tag(&path, OutputFormat::Flac, &metadata(Some(cover)));

        assert!(matches!(result, Err(NarratorError::Tagging { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn non_flac_content_is_a_tagging_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.flac");
        std::fs::write(&path, b"RIFF....WAVE").unwrap();

        let result = MetadataTagger::new().tag(&path, OutputFormat::Flac, &metadata(None));

        assert!(matches!(result, Err(NarratorError::Tagging { .. })));
    }

    #[test]
    fn cover_art_reads_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let cover = dir.path().join("cover.jpg");
        image::RgbImage::new(5, 3).save(&cover).unwrap();

        let art = CoverArt::load(&cover).unwrap();

        assert_eq!(art.mime_type, "image/jpeg");
        assert_eq!((art.width, art.height), (5, 3));
        assert!(!art.data.is_empty());
    }
}
