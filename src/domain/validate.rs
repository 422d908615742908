//! Sanity checks applied to submitted batches before anything reaches storage.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::track::Track;

pub const MAX_BATCH_LEN: usize = 100;
pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_ALBUM_TITLE_CHARS: usize = 300;
pub const MAX_BAND_NAME_CHARS: usize = 100;

static TRACK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://.+/track/[a-z0-9_-]{1,300}$").expect("track url pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("batch must contain between 1 and 100 tracks, got {len}")]
    BatchSize { len: usize },

    #[error("track #{index} (id {track_id}) failed sanity check: {reason}")]
    InvalidTrack {
        index: usize,
        track_id: u32,
        reason: TrackFieldError,
    },
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum TrackFieldError {
    #[error("track id must be positive")]
    ZeroId,

    #[error("track title is empty")]
    EmptyTitle,

    #[error("track title is longer than 300 characters")]
    TitleTooLong,

    #[error("album title is longer than 300 characters")]
    AlbumTitleTooLong,

    #[error("band name is empty")]
    EmptyBandName,

    #[error("band name is longer than 100 characters")]
    BandNameTooLong,

    #[error("track url is not a track page")]
    InvalidUrl,
}

fn too_long(s: &str, max: usize) -> bool {
    s.chars().count() > max
}

pub fn validate_track(track: &Track) -> Result<(), TrackFieldError> {
    if track.track_id == 0 {
        return Err(TrackFieldError::ZeroId);
    }
    if track.track_title.is_empty() {
        return Err(TrackFieldError::EmptyTitle);
    }
    if too_long(&track.track_title, MAX_TITLE_CHARS) {
        return Err(TrackFieldError::TitleTooLong);
    }
    if let Some(album) = &track.album_title {
        if too_long(album, MAX_ALBUM_TITLE_CHARS) {
            return Err(TrackFieldError::AlbumTitleTooLong);
        }
    }
    if track.band_name.is_empty() {
        return Err(TrackFieldError::EmptyBandName);
    }
    if too_long(&track.band_name, MAX_BAND_NAME_CHARS) {
        return Err(TrackFieldError::BandNameTooLong);
    }
    if !TRACK_URL.is_match(&track.track_url) {
        return Err(TrackFieldError::InvalidUrl);
    }
    Ok(())
}

/// Accepts the batch only if its size is in range and every track passes.
pub fn validate_batch(tracks: &[Track]) -> Result<(), ValidationError> {
    if tracks.is_empty() || tracks.len() > MAX_BATCH_LEN {
        return Err(ValidationError::BatchSize { len: tracks.len() });
    }

    for (index, track) in tracks.iter().enumerate() {
        validate_track(track).map_err(|reason| ValidationError::InvalidTrack {
            index,
            track_id: track.track_id,
            reason,
        })?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_track(id: u32) -> Track {
    Track {
        track_id: id,
        track_title: format!("Song {id}"),
        album_title: Some("Album".to_string()),
        band_name: "Band".to_string(),
        track_url: format!("https://band.bandcamp.com/track/song-{id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_track_passes() {
        assert_eq!(validate_track(&sample_track(1)), Ok(()));
    }

    #[test]
    fn test_band_name_length_boundary() {
        let mut track = sample_track(1);

        track.band_name = "b".repeat(100);
        assert_eq!(validate_track(&track), Ok(()));

        track.band_name = "b".repeat(101);
        assert_eq!(
            validate_track(&track),
            Err(TrackFieldError::BandNameTooLong)
        );
    }

    #[test]
    fn test_title_length_boundary_counts_characters() {
        let mut track = sample_track(1);

        // multi-byte characters count once each
        track.track_title = "é".repeat(300);
        assert_eq!(validate_track(&track), Ok(()));

        track.track_title = "é".repeat(301);
        assert_eq!(validate_track(&track), Err(TrackFieldError::TitleTooLong));
    }

    #[test]
    fn test_album_title_is_optional_but_bounded() {
        let mut track = sample_track(1);

        track.album_title = None;
        assert_eq!(validate_track(&track), Ok(()));

        track.album_title = Some("a".repeat(301));
        assert_eq!(
            validate_track(&track),
            Err(TrackFieldError::AlbumTitleTooLong)
        );
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut track = sample_track(1);
        track.track_title.clear();
        assert_eq!(validate_track(&track), Err(TrackFieldError::EmptyTitle));

        let mut track = sample_track(1);
        track.band_name.clear();
        assert_eq!(validate_track(&track), Err(TrackFieldError::EmptyBandName));

        let track = sample_track(0);
        assert_eq!(validate_track(&track), Err(TrackFieldError::ZeroId));
    }

    #[test]
    fn test_track_url_pattern() {
        let mut track = sample_track(1);

        track.track_url = "https://x.example/track/abc_123".to_string();
        assert_eq!(validate_track(&track), Ok(()));

        for bad in [
            "http://x.example/track/abc_123",
            "https://x.example/track/ABC",
            "https://x.example/album/abc",
            "https://x.example/track/",
            "https:///track/abc",
        ] {
            track.track_url = bad.to_string();
            assert_eq!(
                validate_track(&track),
                Err(TrackFieldError::InvalidUrl),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_batch_size_bounds() {
        assert_eq!(
            validate_batch(&[]),
            Err(ValidationError::BatchSize { len: 0 })
        );

        let full: Vec<_> = (1..=100).map(sample_track).collect();
        assert_eq!(validate_batch(&full), Ok(()));

        let over: Vec<_> = (1..=101).map(sample_track).collect();
        assert_eq!(
            validate_batch(&over),
            Err(ValidationError::BatchSize { len: 101 })
        );
    }

    #[test]
    fn test_one_bad_track_rejects_batch() {
        let mut batch: Vec<_> = (1..=5).map(sample_track).collect();
        batch[3].track_url = "https://x.example/track/Nope".to_string();

        assert_eq!(
            validate_batch(&batch),
            Err(ValidationError::InvalidTrack {
                index: 3,
                track_id: 4,
                reason: TrackFieldError::InvalidUrl,
            })
        );
    }
}
