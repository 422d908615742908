//! Conjunctive lookup filters over a closed set of track columns.

use std::collections::BTreeMap;

use crate::storage::schema::columns;

/// Columns a lookup may filter on. Identifier and creation time are not filterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    TrackTitle,
    AlbumTitle,
    BandName,
    TrackUrl,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::TrackTitle,
        FilterField::AlbumTitle,
        FilterField::BandName,
        FilterField::TrackUrl,
    ];

    pub fn column(self) -> &'static str {
        match self {
            FilterField::TrackTitle => columns::TRACK_TITLE,
            FilterField::AlbumTitle => columns::ALBUM_TITLE,
            FilterField::BandName => columns::BAND_NAME,
            FilterField::TrackUrl => columns::TRACK_URL,
        }
    }

    /// form keys are the column names
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupFilter {
    terms: BTreeMap<FilterField, String>,
}

impl LookupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field = value`. Empty values are ignored.
    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.terms.remove(&field);
        } else {
            self.terms.insert(field, value);
        }
    }

    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// builds a filter from key/value pairs, dropping unknown keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filter = Self::new();
        for (key, value) in pairs {
            if let Some(field) = FilterField::from_key(key.as_ref()) {
                filter.set(field, value);
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, field: FilterField) -> Option<&str> {
        self.terms.get(&field).map(String::as_str)
    }

    /// `col = ?1 AND col = ?2 ...`, numbered in the same order as [`Self::values`]
    pub fn where_clause(&self) -> String {
        self.terms
            .keys()
            .enumerate()
            .map(|(i, field)| format!("{} = ?{}", field.column(), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.terms.values().map(String::as_str)
    }
}
