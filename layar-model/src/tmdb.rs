//! Response shapes returned by the TMDB v3 API.
//!
//! Only the fields the catalog consumes are modelled; everything else in the
//! provider payload is ignored on deserialization. Every field is defaulted so
//! partial payloads still parse.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbSearchResult {
    pub id: u64,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbMovieDetails {
    pub id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genres: Vec<TmdbNamed>,
    pub production_countries: Vec<TmdbNamed>,
    pub credits: Option<TmdbCredits>,
    pub videos: Option<TmdbVideos>,
}

/// Genres, countries and similar `{ "name": ... }` lookups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbNamed {
    pub name: String,
}

impl TmdbNamed {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbCredits {
    pub cast: Vec<TmdbCastMember>,
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbCastMember {
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbCrewMember {
    pub name: String,
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbVideos {
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbVideo {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
}
