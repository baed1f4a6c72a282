use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::lenient;

/// A catalog row as it is stored locally.
///
/// Column names follow the scraped dataset (`judul`, `tahun`, `sinopsis`,
/// `sutradara`); the Rust field names are their English equivalents. Any
/// column this struct does not model lands in [`MovieRecord::extra`], and so
/// does a modelled text column whose stored value is not a string (an
/// explicit `null`, say). Serializing a record reproduces the document it
/// was read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovieRecord {
    pub slug: String,
    /// `judul`
    pub title: Option<String>,
    pub url: Option<String>,
    /// `tahun` exactly as stored; see [`MovieRecord::year_text`].
    pub year: Option<Value>,
    pub genre: Option<String>,
    /// Stored rating, which may be a number, a numeric string or a
    /// placeholder such as `"nan"`; see [`MovieRecord::rating_value`].
    pub rating: Option<Value>,
    pub votes: Option<Value>,
    pub quality: Option<Value>,
    pub durasi: Option<Value>,
    pub negara: Option<Value>,
    /// `sutradara`
    pub director: Option<String>,
    pub cast: Option<Value>,
    pub jumlah_cast: Option<Value>,
    /// `sinopsis`
    pub synopsis: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<Value>,
    pub players: PlayerServers,
    pub extra: Map<String, Value>,
}

impl MovieRecord {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Splits a stored document into modelled columns and `extra`.
    pub fn from_document(mut doc: Map<String, Value>) -> Self {
        let slug = match doc.remove("slug") {
            Some(Value::String(slug)) => slug,
            Some(other) => {
                doc.insert("slug".into(), other);
                String::new()
            }
            None => String::new(),
        };

        Self {
            slug,
            title: take_text(&mut doc, "judul"),
            url: take_text(&mut doc, "url"),
            year: doc.remove("tahun"),
            genre: take_text(&mut doc, "genre"),
            rating: doc.remove("rating"),
            votes: doc.remove("votes"),
            quality: doc.remove("quality"),
            durasi: doc.remove("durasi"),
            negara: doc.remove("negara"),
            director: take_text(&mut doc, "sutradara"),
            cast: doc.remove("cast"),
            jumlah_cast: doc.remove("jumlah_cast"),
            synopsis: take_text(&mut doc, "sinopsis"),
            poster_url: take_text(&mut doc, "poster_url"),
            release_date: doc.remove("release_date"),
            players: PlayerServers::take_from(&mut doc),
            extra: doc,
        }
    }

    /// The stored document. Absent columns stay absent.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.extra.clone();
        if !self.slug.is_empty() || !doc.contains_key("slug") {
            doc.insert("slug".into(), Value::String(self.slug.clone()));
        }

        for (key, value) in [
            ("judul", &self.title),
            ("url", &self.url),
            ("genre", &self.genre),
            ("sutradara", &self.director),
            ("sinopsis", &self.synopsis),
            ("poster_url", &self.poster_url),
        ] {
            if let Some(value) = value {
                doc.insert(key.into(), Value::String(value.clone()));
            }
        }

        for (key, value) in [
            ("tahun", &self.year),
            ("rating", &self.rating),
            ("votes", &self.votes),
            ("quality", &self.quality),
            ("durasi", &self.durasi),
            ("negara", &self.negara),
            ("cast", &self.cast),
            ("jumlah_cast", &self.jumlah_cast),
            ("release_date", &self.release_date),
        ] {
            if let Some(value) = value {
                doc.insert(key.into(), value.clone());
            }
        }

        self.players.put_into(&mut doc);
        doc
    }

    /// Title usable for a lookup: trimmed, `None` when missing or blank.
    pub fn title_str(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }

    /// `tahun` as text, with numeric years printed as integers.
    pub fn year_text(&self) -> Option<String> {
        self.year.as_ref().and_then(lenient::year_text)
    }

    /// Numeric rating, `None` when missing or not a finite number.
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_ref().and_then(lenient::finite_f64)
    }
}

fn take_text(doc: &mut Map<String, Value>, key: &str) -> Option<String> {
    match doc.remove(key)? {
        Value::String(text) => Some(text),
        other => {
            doc.insert(key.to_string(), other);
            None
        }
    }
}

impl Serialize for MovieRecord {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MovieRecord {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer)
            .map(Self::from_document)
    }
}

/// Streaming-host columns. Enrichment never interprets them; it only
/// regroups them under `players`. An explicit `null` is kept distinct from
/// an absent column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerServers {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub hydrax_servers: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub hydrax_count: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub turbovip_servers: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub turbovip_count: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub p2p_servers: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub p2p_count: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub cast_servers: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub cast_count: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub other_servers: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub other_count: Option<Value>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::present"
    )]
    pub total_servers: Option<Value>,
}

impl PlayerServers {
    /// Field names as they appear on a stored document.
    pub const FIELDS: [&'static str; 11] = [
        "hydrax_servers",
        "hydrax_count",
        "turbovip_servers",
        "turbovip_count",
        "p2p_servers",
        "p2p_count",
        "cast_servers",
        "cast_count",
        "other_servers",
        "other_count",
        "total_servers",
    ];

    fn slots(&self) -> [&Option<Value>; 11] {
        [
            &self.hydrax_servers,
            &self.hydrax_count,
            &self.turbovip_servers,
            &self.turbovip_count,
            &self.p2p_servers,
            &self.p2p_count,
            &self.cast_servers,
            &self.cast_count,
            &self.other_servers,
            &self.other_count,
            &self.total_servers,
        ]
    }

    fn slots_mut(&mut self) -> [&mut Option<Value>; 11] {
        [
            &mut self.hydrax_servers,
            &mut self.hydrax_count,
            &mut self.turbovip_servers,
            &mut self.turbovip_count,
            &mut self.p2p_servers,
            &mut self.p2p_count,
            &mut self.cast_servers,
            &mut self.cast_count,
            &mut self.other_servers,
            &mut self.other_count,
            &mut self.total_servers,
        ]
    }

    fn take_from(doc: &mut Map<String, Value>) -> Self {
        let mut players = Self::default();
        for (key, slot) in Self::FIELDS.into_iter().zip(players.slots_mut()) {
            *slot = doc.remove(key);
        }
        players
    }

    fn put_into(&self, doc: &mut Map<String, Value>) {
        for (key, slot) in Self::FIELDS.into_iter().zip(self.slots()) {
            if let Some(value) = slot {
                doc.insert(key.into(), value.clone());
            }
        }
    }
}
