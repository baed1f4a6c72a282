use std::{
    io::Write,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum_test::TestServer;
use layar_config::{Config, ConfigLoader, models::sources::EnvConfig};
use layar_core::{BundledStore, MetadataProvider, MovieEnricher};
use layar_model::{
    MovieRecord, TmdbCredits, TmdbCrewMember, TmdbMovieDetails, TmdbSearchResult,
};
use layar_server::{AppState, create_app};
use serde_json::{Value, json};
use tempfile::NamedTempFile;

/// Knows exactly one film: "Heat" from 1995.
#[derive(Debug, Default)]
pub struct FakeProvider {
    pub searches: AtomicUsize,
}

impl FakeProvider {
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Option<TmdbSearchResult> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        (title == "Heat" && year == Some(1995)).then(|| TmdbSearchResult {
            id: 949,
            title: "Heat".into(),
            ..TmdbSearchResult::default()
        })
    }

    async fn movie_details(&self, id: u64) -> Option<TmdbMovieDetails> {
        (id == 949).then(|| TmdbMovieDetails {
            id,
            title: "Heat".into(),
            overview: Some("A group of high-end professional thieves.".into()),
            vote_average: Some(7.9),
            poster_path: Some("/heat.jpg".into()),
            credits: Some(TmdbCredits {
                cast: vec![],
                crew: vec![TmdbCrewMember {
                    name: "Michael Mann".into(),
                    job: "Director".into(),
                }],
            }),
            ..TmdbMovieDetails::default()
        })
    }
}

pub fn catalog_documents() -> Value {
    json!([
        {"slug": "heat-1995", "judul": "Heat (1995)", "tahun": 1995, "rating": 8.3,
         "genre": "Action, Crime", "hydrax_servers": "[\"h1\"]", "hydrax_count": 1},
        {"slug": "untitled", "judul": null, "tahun": "2020", "rating": 9.9},
        {"slug": "ronin", "judul": "Ronin", "tahun": "1998", "rating": 7.2,
         "genre": "Action, Thriller", "sinopsis": "Mercenaries chase a briefcase."},
        {"slug": "amelie", "judul": "Amelie", "tahun": "2001", "rating": "nan",
         "genre": "Comedy, Romance"},
        {"slug": "collateral", "judul": "Collateral", "tahun": "2004", "rating": 7.5,
         "genre": "Crime, Thriller"}
    ])
}

pub fn catalog() -> Vec<MovieRecord> {
    serde_json::from_value(catalog_documents()).expect("fixture is valid")
}

pub fn test_config(env: EnvConfig) -> Config {
    let mut file = NamedTempFile::new().expect("temp config");
    writeln!(file, "[store]\nbackend = \"bundled\"").expect("write config");
    ConfigLoader::new()
        .with_config_path(file.path())
        .load_with_env(env, false)
        .expect("config loads")
        .config
}

pub struct TestApp {
    pub server: TestServer,
    pub provider: Option<Arc<FakeProvider>>,
}

pub fn build_test_app(with_enricher: bool, env: EnvConfig) -> TestApp {
    let config = test_config(env);
    let store = BundledStore::from_records(catalog(), PathBuf::from("fixture.json"));

    let provider = with_enricher.then(|| Arc::new(FakeProvider::default()));
    let enricher = provider.as_ref().map(|provider| {
        Arc::new(
            MovieEnricher::new(provider.clone() as Arc<dyn MetadataProvider>)
                .with_pacing(Duration::ZERO),
        )
    });

    let state = AppState::new(Arc::new(store), enricher, Arc::new(config));
    let server = TestServer::new(create_app(state)).expect("test server");

    TestApp { server, provider }
}
