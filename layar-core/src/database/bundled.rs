use async_trait::async_trait;
use layar_model::{MoviePage, MovieQuery, MovieRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

use super::{MovieStore, stored_tmdb_id};
use crate::{
    error::{CatalogError, Result},
    query,
};

/// Read-only store over the bundled JSON dataset, loaded once into memory.
#[derive(Clone)]
pub struct BundledStore {
    records: Arc<Vec<MovieRecord>>,
    source: PathBuf,
}

impl fmt::Debug for BundledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundledStore")
            .field("source", &self.source)
            .field("records", &self.records.len())
            .finish()
    }
}

impl BundledStore {
    /// Loads the first candidate path that exists.
    pub async fn open(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Self::load(path).await;
            }
            warn!(path = %path.display(), "bundled dataset not found at candidate path");
        }

        Err(CatalogError::MissingDataset {
            tried: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            CatalogError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let records = parse_dataset(&bytes)?;

        info!(
            path = %path.display(),
            records = records.len(),
            size_mb = format!("{:.2}", bytes.len() as f64 / (1024.0 * 1024.0)),
            "loaded bundled dataset"
        );

        Ok(Self::from_records(records, path.to_path_buf()))
    }

    pub fn from_records(records: Vec<MovieRecord>, source: PathBuf) -> Self {
        Self {
            records: Arc::new(records),
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn read_only(&self) -> CatalogError {
        CatalogError::ReadOnly {
            backend: self.backend(),
        }
    }
}

static BARE_NAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:\[,]\s*)-?NaN\b").unwrap());

/// Parses a JSON array of records. Exports from pandas may carry bare `NaN`
/// tokens, which are read as null.
pub fn parse_dataset(bytes: &[u8]) -> Result<Vec<MovieRecord>> {
    match serde_json::from_slice(bytes) {
        Ok(records) => Ok(records),
        Err(err) => {
            let text = String::from_utf8_lossy(bytes);
            if !BARE_NAN.is_match(&text) {
                return Err(err.into());
            }
            warn!("dataset contains bare NaN tokens; reading them as null");
            let cleaned = BARE_NAN.replace_all(&text, "${1}null");
            Ok(serde_json::from_str(&cleaned)?)
        }
    }
}

/// CSV columns read as numbers. Cells that do not parse become null.
const NUMERIC_COLUMNS: &[&str] = &[
    "rating",
    "votes",
    "jumlah_cast",
    "hydrax_count",
    "turbovip_count",
    "p2p_count",
    "cast_count",
    "other_count",
    "total_servers",
];

/// Parses a CSV export with a header row into records. Empty cells are null,
/// [`NUMERIC_COLUMNS`] become numbers and every other column stays text.
pub fn parse_csv_dataset(bytes: &[u8]) -> Result<Vec<MovieRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let document = headers
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| (column.to_string(), csv_cell(column, cell)))
            .collect::<Map<String, Value>>();
        records.push(MovieRecord::from_document(document));
    }
    Ok(records)
}

fn csv_cell(column: &str, cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if !NUMERIC_COLUMNS.contains(&column) {
        return Value::String(cell.to_string());
    }

    let trimmed = cell.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

#[async_trait]
impl MovieStore for BundledStore {
    fn backend(&self) -> &'static str {
        "bundled"
    }

    fn is_writable(&self) -> bool {
        false
    }

    async fn search(&self, query: &MovieQuery) -> Result<MoviePage> {
        Ok(query::apply(self.records.as_ref().clone(), query))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<MovieRecord>> {
        Ok(self.records.iter().find(|r| r.slug == slug).cloned())
    }

    async fn find_by_tmdb_id(
        &self,
        tmdb_id: u64,
    ) -> Result<Option<MovieRecord>> {
        Ok(self
            .records
            .iter()
            .find(|r| stored_tmdb_id(r) == Some(tmdb_id))
            .cloned())
    }

    async fn upsert_many(&self, _records: &[MovieRecord]) -> Result<usize> {
        Err(self.read_only())
    }

    async fn export_all(&self) -> Result<Vec<MovieRecord>> {
        Ok(self.records.as_ref().clone())
    }

    async fn clear(&self) -> Result<u64> {
        Err(self.read_only())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn dataset() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = json!([
            {"slug": "heat", "judul": "Heat (1995)", "tahun": 1995, "rating": 8.3, "tmdb_id": 949},
            {"slug": "no-title", "judul": null, "tahun": "2020", "rating": "nan"},
            {"slug": "ronin", "judul": "Ronin", "tahun": "1998", "rating": "7.2"}
        ]);
        file.write_all(body.to_string().as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn loads_first_existing_candidate() {
        let file = dataset();
        let store = BundledStore::open(&[
            PathBuf::from("/missing/movies.json"),
            file.path().to_path_buf(),
        ])
        .await
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.source(), file.path());
    }

    #[tokio::test]
    async fn missing_dataset_lists_candidates() {
        let err = BundledStore::open(&[PathBuf::from("/missing/a.json")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/missing/a.json"));
    }

    #[tokio::test]
    async fn lookups_and_listing() {
        let file = dataset();
        let store = BundledStore::load(file.path()).await.unwrap();

        let page = store.search(&MovieQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.movies[0].slug, "heat");
        assert_eq!(page.movies[1].rating_value(), Some(7.2));

        let heat = store.find_by_slug("heat").await.unwrap().unwrap();
        assert_eq!(heat.year, Some(json!(1995)));
        assert_eq!(heat.year_text().as_deref(), Some("1995"));
        assert!(store.find_by_slug("nope").await.unwrap().is_none());

        let by_id = store.find_by_tmdb_id(949).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "heat");

        assert_eq!(store.export_all().await.unwrap().len(), 3);
    }

    #[test]
    fn bare_nan_tokens_read_as_null() {
        let raw = br#"[{"slug": "x", "judul": "X", "rating": NaN, "votes": [NaN, 1]}]"#;
        let records = parse_dataset(raw).unwrap();
        assert_eq!(records[0].rating, Some(serde_json::Value::Null));
        assert_eq!(records[0].rating_value(), None);
        assert_eq!(records[0].votes, Some(json!([null, 1])));

        assert!(parse_dataset(b"[{\"slug\": }]").is_err());
    }

    #[test]
    fn csv_rows_become_records() {
        let raw = "slug,judul,tahun,rating,votes,genre,jumlah_cast,total_servers\n\
                   heat,\"Heat, Director's Cut\",1995,8.3,\"1,2\",Crime,12,3\n\
                   blank,,,N/A,,,x,\n";
        let records = parse_csv_dataset(raw.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let heat = &records[0];
        assert_eq!(heat.slug, "heat");
        assert_eq!(heat.title.as_deref(), Some("Heat, Director's Cut"));
        assert_eq!(heat.year, Some(json!("1995")));
        assert_eq!(heat.rating, Some(json!(8.3)));
        assert_eq!(heat.votes, Some(Value::Null));
        assert_eq!(heat.jumlah_cast, Some(json!(12)));
        assert_eq!(heat.players.total_servers, Some(json!(3)));

        let blank = &records[1];
        assert_eq!(blank.title, None);
        assert_eq!(blank.year_text(), None);
        assert_eq!(blank.rating, Some(Value::Null));
        assert_eq!(blank.jumlah_cast, Some(Value::Null));
        assert_eq!(blank.to_document()["judul"], Value::Null);
    }

    #[test]
    fn csv_rows_may_be_short() {
        let raw = "slug,judul,negara\nronin,Ronin\n";
        let records = parse_csv_dataset(raw.as_bytes()).unwrap();
        assert_eq!(records[0].title.as_deref(), Some("Ronin"));
        assert_eq!(records[0].negara, None);
    }

    #[tokio::test]
    async fn writes_are_rejected() {
        let store = BundledStore::from_records(vec![], PathBuf::from("mem"));
        assert!(!store.is_writable());
        assert!(matches!(
            store.upsert_many(&[MovieRecord::new("a", "A")]).await,
            Err(CatalogError::ReadOnly { backend: "bundled" })
        ));
        assert!(matches!(
            store.clear().await,
            Err(CatalogError::ReadOnly { .. })
        ));
    }
}
