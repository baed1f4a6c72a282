use serde::{Deserialize, Serialize};

use crate::movie::{MovieRecord, PlayerServers};

/// A local record with TMDB metadata layered on top.
///
/// Serializes as the local document plus the `tmdb_*` keys, a `players`
/// object and `tmdb_trailers`. Local fields are never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMovie {
    #[serde(flatten)]
    pub local: MovieRecord,
    pub tmdb_id: u64,
    pub tmdb_title: String,
    pub tmdb_overview: Option<String>,
    pub tmdb_rating: Option<f64>,
    pub tmdb_vote_count: Option<u64>,
    pub tmdb_release_date: Option<String>,
    pub tmdb_runtime: Option<u32>,
    #[serde(default)]
    pub tmdb_genres: Vec<String>,
    #[serde(default)]
    pub tmdb_production_countries: Vec<String>,
    pub tmdb_director: Option<String>,
    #[serde(default)]
    pub tmdb_cast: Vec<CastCredit>,
    pub tmdb_poster: Option<String>,
    pub tmdb_backdrop: Option<String>,
    #[serde(default)]
    pub players: PlayerServers,
    #[serde(default)]
    pub tmdb_trailers: Vec<Trailer>,
}

impl EnrichedMovie {
    /// Keys owned by enrichment. A stored document carrying any of these has
    /// them replaced when it is enriched again.
    pub const FIELDS: [&'static str; 16] = [
        "tmdb_id",
        "tmdb_title",
        "tmdb_overview",
        "tmdb_rating",
        "tmdb_vote_count",
        "tmdb_release_date",
        "tmdb_runtime",
        "tmdb_genres",
        "tmdb_production_countries",
        "tmdb_director",
        "tmdb_cast",
        "tmdb_poster",
        "tmdb_backdrop",
        "players",
        "tmdb_trailers",
        "tmdb_enriched_at",
    ];

    /// Flattens the enrichment into a plain record so it can be persisted.
    /// The `tmdb_*` keys and `players` end up in [`MovieRecord::extra`].
    pub fn into_record(self) -> serde_json::Result<MovieRecord> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CastCredit {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trailer {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub youtube_url: String,
}

/// Result of running one record through enrichment.
///
/// Untagged on the wire: clients see either the enriched document or the
/// original one, never a wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MovieEntry {
    Enriched(Box<EnrichedMovie>),
    Local(MovieRecord),
}

impl MovieEntry {
    pub fn slug(&self) -> &str {
        &self.record().slug
    }

    pub fn record(&self) -> &MovieRecord {
        match self {
            MovieEntry::Enriched(movie) => &movie.local,
            MovieEntry::Local(record) => record,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, MovieEntry::Enriched(_))
    }

    pub fn as_enriched(&self) -> Option<&EnrichedMovie> {
        match self {
            MovieEntry::Enriched(movie) => Some(movie),
            MovieEntry::Local(_) => None,
        }
    }
}

impl From<MovieRecord> for MovieEntry {
    fn from(record: MovieRecord) -> Self {
        MovieEntry::Local(record)
    }
}

impl From<EnrichedMovie> for MovieEntry {
    fn from(movie: EnrichedMovie) -> Self {
        MovieEntry::Enriched(Box::new(movie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn enriched() -> EnrichedMovie {
        let mut local = MovieRecord::new("heat-1995", "Heat (1995)");
        local.year = Some("1995".into());
        local.players.hydrax_count = Some(json!(2));
        local.extra.insert("created_at".into(), json!("2025-01-01"));

        EnrichedMovie {
            players: local.players.clone(),
            local,
            tmdb_id: 949,
            tmdb_title: "Heat".into(),
            tmdb_overview: Some("Obsessive master thief...".into()),
            tmdb_rating: Some(7.9),
            tmdb_vote_count: Some(7000),
            tmdb_release_date: Some("1995-12-15".into()),
            tmdb_runtime: Some(170),
            tmdb_genres: vec!["Crime".into()],
            tmdb_production_countries: vec!["United States of America".into()],
            tmdb_director: Some("Michael Mann".into()),
            tmdb_cast: vec![],
            tmdb_poster: None,
            tmdb_backdrop: None,
            tmdb_trailers: vec![Trailer {
                key: "abc".into(),
                name: "Trailer".into(),
                kind: "Trailer".into(),
                youtube_url: "https://www.youtube.com/watch?v=abc".into(),
            }],
        }
    }

    #[test]
    fn test_enriched_serializes_flat_with_grouped_players() {
        let value = serde_json::to_value(MovieEntry::from(enriched())).unwrap();

        assert_eq!(value["slug"], "heat-1995");
        assert_eq!(value["judul"], "Heat (1995)");
        assert_eq!(value["hydrax_count"], 2);
        assert_eq!(value["players"]["hydrax_count"], 2);
        assert_eq!(value["players"]["total_servers"], Value::Null);
        assert_eq!(value["tmdb_id"], 949);
        assert_eq!(value["tmdb_trailers"][0]["type"], "Trailer");
        assert_eq!(value["created_at"], "2025-01-01");
    }

    #[test]
    fn test_local_entry_serializes_as_the_record() {
        let record = MovieRecord::new("a", "A");
        let entry = MovieEntry::from(record.clone());
        assert!(!entry.is_enriched());
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::to_value(&record).unwrap()
        );
    }

    #[test]
    fn test_into_record_keeps_enrichment_in_extra() {
        let record = enriched().into_record().unwrap();
        assert_eq!(record.slug, "heat-1995");
        assert_eq!(record.extra["tmdb_id"], 949);
        assert_eq!(record.extra["players"]["hydrax_count"], 2);
        assert_eq!(record.extra["created_at"], "2025-01-01");
        assert_eq!(record.players.hydrax_count, Some(json!(2)));
    }
}
