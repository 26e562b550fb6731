//! Track tags and cover art for rendered frames.

use std::fs;
use std::path::{Path, PathBuf};

use lofty::picture::PictureType;
use lofty::prelude::{Accessor, TaggedFileExt};
use lofty::tag::{ItemKey, Tag};

use crate::models::TrackMetadata;

/// Sidecar cover names, searched next to the audio file.
pub const SIDECAR_COVERS: &[&str] = &["cover.jpg", "cover.png", "folder.jpg", "front.jpg"];

/// Format-specific identifiers (Vorbis, ID3v2, MP4, RIFF INFO, APE).
const TITLE_IDS: &[&str] = &["TITLE", "TIT2", "\u{a9}nam", "INAM", "Title"];
const ARTIST_IDS: &[&str] = &["ARTIST", "TPE1", "\u{a9}ART", "IART", "Artist"];
const ALBUM_IDS: &[&str] = &["ALBUM", "TALB", "\u{a9}alb", "IPRD", "Album"];
const TRACK_IDS: &[&str] = &["TRACKNUMBER", "TRCK", "trkn", "ITRK", "Track"];

/// Read tags for track `number` (1-based).
///
/// Unreadable files or missing titles give the `Track N` placeholder.
pub fn read_track_metadata(path: &Path, number: usize) -> TrackMetadata {
    let tagged = match lofty::read_from_path(path) {
        Ok(tagged) => tagged,
        Err(e) => {
            tracing::debug!("No tags for {}: {}", path.display(), e);
            return TrackMetadata::placeholder(number);
        }
    };

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return TrackMetadata::placeholder(number);
    };

    metadata_from_tag(tag, number)
}

/// Extract metadata: accessor keys first, then raw identifiers.
pub fn metadata_from_tag(tag: &Tag, number: usize) -> TrackMetadata {
    let title = tag
        .title()
        .map(|t| t.to_string())
        .or_else(|| text_by_id(tag, TITLE_IDS))
        .filter(|t| !t.trim().is_empty());
    let artist = tag
        .artist()
        .map(|t| t.to_string())
        .or_else(|| tag.get_string(&ItemKey::AlbumArtist).map(str::to_string))
        .or_else(|| text_by_id(tag, ARTIST_IDS))
        .filter(|t| !t.trim().is_empty());
    let album = tag
        .album()
        .map(|t| t.to_string())
        .or_else(|| text_by_id(tag, ALBUM_IDS))
        .filter(|t| !t.trim().is_empty());
    let track_number = tag.track().or_else(|| {
        text_by_id(tag, TRACK_IDS).and_then(|t| parse_track_number(&t))
    });

    let cover = tag
        .pictures()
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| tag.pictures().first())
        .map(|p| p.data().to_vec());

    let placeholder = TrackMetadata::placeholder(number);
    TrackMetadata {
        title: title.unwrap_or(placeholder.title),
        artist,
        album,
        track_number,
        cover,
    }
}

fn text_by_id(tag: &Tag, ids: &[&str]) -> Option<String> {
    tag.items().find_map(|item| {
        let ItemKey::Unknown(key) = item.key() else {
            return None;
        };
        if ids.iter().any(|id| id.eq_ignore_ascii_case(key)) {
            item.value().text().map(str::to_string)
        } else {
            None
        }
    })
}

/// `"3/12"` or `"03"` to 3.
fn parse_track_number(text: &str) -> Option<u32> {
    text.split('/').next()?.trim().parse().ok()
}

/// First sidecar cover image next to `audio_path`.
pub fn find_sidecar_cover(audio_path: &Path) -> Option<PathBuf> {
    let dir = audio_path.parent()?;
    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    SIDECAR_COVERS.iter().find_map(|wanted| {
        entries
            .iter()
            .find(|p| {
                p.file_name()
                    .is_some_and(|n| n.to_string_lossy().eq_ignore_ascii_case(wanted))
            })
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::tag::{ItemValue, TagItem, TagType};

    #[test]
    fn accessor_keys_first() {
        let mut tag = Tag::new(TagType::VorbisComments);
        tag.set_title("Blue in Green".to_string());
        tag.set_artist("Miles Davis".to_string());
        tag.set_album("Kind of Blue".to_string());
        tag.set_track(3);

        let meta = metadata_from_tag(&tag, 3);
        assert_eq!(meta.title, "Blue in Green");
        assert_eq!(meta.artist.as_deref(), Some("Miles Davis"));
        assert_eq!(meta.album.as_deref(), Some("Kind of Blue"));
        assert_eq!(meta.track_number, Some(3));
        assert!(meta.cover.is_none());
    }

    #[test]
    fn identifier_fallback() {
        let mut tag = Tag::new(TagType::Id3v2);
        tag.push_unchecked(TagItem::new(
            ItemKey::Unknown("TIT2".to_string()),
            ItemValue::Text("So What".to_string()),
        ));
        tag.push_unchecked(TagItem::new(
            ItemKey::Unknown("TRCK".to_string()),
            ItemValue::Text("1/5".to_string()),
        ));

        let meta = metadata_from_tag(&tag, 1);
        assert_eq!(meta.title, "So What");
        assert_eq!(meta.track_number, Some(1));
    }

    #[test]
    fn placeholder_when_untitled() {
        let tag = Tag::new(TagType::Id3v2);
        assert_eq!(metadata_from_tag(&tag, 7).title, "Track 7");

        let meta = read_track_metadata(Path::new("/nonexistent/song.flac"), 2);
        assert_eq!(meta, TrackMetadata::placeholder(2));
    }

    #[test]
    fn sidecar_cover_order() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("01.flac");
        fs::write(&audio, b"").unwrap();
        assert_eq!(find_sidecar_cover(&audio), None);

        fs::write(dir.path().join("Folder.jpg"), b"").unwrap();
        fs::write(dir.path().join("cover.png"), b"").unwrap();
        assert_eq!(find_sidecar_cover(&audio), Some(dir.path().join("cover.png")));
    }

    #[test]
    fn track_number_text() {
        assert_eq!(parse_track_number("04/12"), Some(4));
        assert_eq!(parse_track_number("x"), None);
    }
}
