use std::time::SystemTime;

use crate::{
    config,
    domain::track::{StoredTrack, Track},
    storage::{
        db::{self, system_time_to_i64},
        error::StorageError,
        filter::LookupFilter,
        schema::{columns, tables},
    },
};

use columns::*;
use rusqlite::{ffi, params, params_from_iter};
use tables::*;

/// Append-only archive of discovered tracks
pub struct Store {
    pub(crate) db: rusqlite::Connection,
}

fn insert_error(err: rusqlite::Error, track_id: u32) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE => {
            StorageError::DuplicateTrack(track_id)
        }
        _ => StorageError::Database(err),
    }
}

impl Store {
    /// when called, opens a data base connection
    pub fn open(db_config: &config::Database) -> Result<Self, StorageError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    /// Inserts every track of the batch in one transaction.
    ///
    /// Either all tracks are committed or none are: the first failing insert
    /// aborts and the uncommitted transaction is rolled back when dropped.
    pub fn insert_batch(&mut self, tracks: &[Track]) -> Result<usize, StorageError> {
        let created_at = system_time_to_i64(SystemTime::now()).map_err(StorageError::Internal)?;
        let tx = self.db.transaction()?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {TRACKS} ({TRACK_ID}, {TRACK_TITLE}, {ALBUM_TITLE}, {BAND_NAME}, {TRACK_URL}, {CREATED_AT}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))?;

            for track in tracks {
                stmt.execute(params![
                    track.track_id,
                    track.track_title,
                    track.album_title,
                    track.band_name,
                    track.track_url,
                    created_at,
                ])
                .map_err(|e| insert_error(e, track.track_id))?;
            }
        }

        tx.commit()?;
        Ok(tracks.len())
    }

    /// Returns tracks matching every term of the filter, newest first.
    ///
    /// An empty filter is refused before any query is prepared.
    pub fn lookup(&self, filter: &LookupFilter) -> Result<Vec<StoredTrack>, StorageError> {
        if filter.is_empty() {
            return Err(StorageError::EmptyFilter);
        }

        let mut stmt = self.db.prepare(&format!(
            "SELECT {TRACK_ID}, {TRACK_TITLE}, {ALBUM_TITLE}, {BAND_NAME}, {TRACK_URL}, {CREATED_AT} \
             FROM {TRACKS} WHERE {} ORDER BY {SEQ} DESC",
            filter.where_clause()
        ))?;

        let tracks = stmt
            .query_map(params_from_iter(filter.values()), |row| {
                Ok(StoredTrack {
                    track: Track {
                        track_id: row.get(0)?,
                        track_title: row.get(1)?,
                        album_title: row.get(2)?,
                        band_name: row.get(3)?,
                        track_url: row.get(4)?,
                    },
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tracks)
    }

    pub fn count_tracks(&self) -> Result<u64, StorageError> {
        let count: i64 =
            self.db
                .query_row(&format!("SELECT COUNT(*) FROM {TRACKS}"), [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
