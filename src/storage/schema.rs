use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";

    pub const ALL_TABLES: &[&str] = &[TRACKS];
}

pub mod columns {
    pub const SEQ: &str = "seq";
    pub const TRACK_ID: &str = "track_id";
    pub const TRACK_TITLE: &str = "track_title";
    pub const ALBUM_TITLE: &str = "album_title";
    pub const BAND_NAME: &str = "band_name";
    pub const TRACK_URL: &str = "track_url";
    pub const CREATED_AT: &str = "created_at";
}

pub use columns::*;
pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    track_id INTEGER NOT NULL UNIQUE,
    track_title TEXT NOT NULL,
    album_title TEXT,
    band_name TEXT NOT NULL,
    track_url TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS tracks_track_title ON tracks (track_title);
CREATE INDEX IF NOT EXISTS tracks_album_title ON tracks (album_title);
CREATE INDEX IF NOT EXISTS tracks_band_name ON tracks (band_name);
CREATE INDEX IF NOT EXISTS tracks_track_url ON tracks (track_url);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
