use axum::{
    Json,
    extract::{Path, Query, State},
};
use layar_model::{MovieEntry, MovieQuery, SortField, SortOrder, query::DEFAULT_LIMIT};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Raw query string for `GET /api/movies`. Values stay strings so that
/// parse failures surface as a 400 with the parameter name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub genre: Option<String>,
    pub tahun: Option<String>,
    pub min_rating: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub tmdb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailParams {
    pub tmdb: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub success: bool,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub tmdb_enriched: bool,
    pub data: Vec<MovieEntry>,
}

#[derive(Debug, Serialize)]
pub struct MovieDetailResponse {
    pub success: bool,
    pub data: MovieEntry,
}

impl ListParams {
    pub fn to_query(&self) -> AppResult<MovieQuery> {
        Ok(MovieQuery {
            search: non_blank(&self.search),
            genre: non_blank(&self.genre),
            tahun: non_blank(&self.tahun),
            min_rating: parse_param("minRating", &self.min_rating)?,
            limit: parse_param("limit", &self.limit)?.unwrap_or(DEFAULT_LIMIT),
            offset: parse_param("offset", &self.offset)?.unwrap_or(0),
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortField::from_param)
                .unwrap_or_default(),
            order: self
                .order
                .as_deref()
                .map(SortOrder::from_param)
                .unwrap_or_default(),
        })
    }
}

/// `true` and `1` switch enrichment on, any other value switches it off.
/// An absent parameter falls back to `default`.
pub fn tmdb_flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(value) => value == "true" || value == "1",
        None => default,
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_param<T: FromStr>(
    name: &str,
    raw: &Option<String>,
) -> AppResult<Option<T>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            AppError::bad_request(format!("Invalid query parameter: {name}"))
        }),
    }
}

/// List movies with filters, sorting and pagination.
pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<MovieListResponse>> {
    let query = params.to_query()?;
    let page = state.store.search(&query).await?;

    let wants_tmdb = tmdb_flag(params.tmdb.as_deref(), false);
    let enricher = state.enricher.as_ref().filter(|_| wants_tmdb);
    if wants_tmdb && enricher.is_none() {
        debug!("enrichment requested but no TMDB key is configured");
    }

    let tmdb_enriched = enricher.is_some();
    let data = match enricher {
        Some(enricher) => {
            let settings = &state.config().enrichment;
            enricher
                .enrich_prefix(page.movies, settings.batch_cap, settings.use_cache)
                .await
        }
        None => page.movies.into_iter().map(MovieEntry::Local).collect(),
    };

    Ok(Json(MovieListResponse {
        success: true,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
        tmdb_enriched,
        data,
    }))
}

/// Single movie by slug, enriched unless `tmdb` says otherwise.
pub async fn get_movie(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<DetailParams>,
) -> AppResult<Json<MovieDetailResponse>> {
    if slug.trim().is_empty() {
        return Err(AppError::bad_request("Slug parameter is required"));
    }

    let Some(movie) = state.store.find_by_slug(&slug).await? else {
        return Err(AppError::not_found("Movie not found"));
    };

    let data = match (&state.enricher, tmdb_flag(params.tmdb.as_deref(), true))
    {
        (Some(enricher), true) => enricher.enrich_one(&movie).await,
        _ => MovieEntry::Local(movie),
    };

    Ok(Json(MovieDetailResponse {
        success: true,
        data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_map_to_query() {
        let params = ListParams {
            search: Some(" heat ".into()),
            limit: Some("10".into()),
            offset: Some("".into()),
            min_rating: Some("7.5".into()),
            sort_by: Some("tahun".into()),
            order: Some("asc".into()),
            ..ListParams::default()
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.search.as_deref(), Some("heat"));
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);
        assert_eq!(query.min_rating, Some(7.5));
        assert_eq!(query.sort_by, SortField::Year);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn defaults_when_absent() {
        let query = ListParams::default().to_query().unwrap();
        assert_eq!(query, MovieQuery::default());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let params = ListParams {
            limit: Some("ten".into()),
            ..ListParams::default()
        };
        let err = params.to_query().unwrap_err();
        assert_eq!(err.message, "Invalid query parameter: limit");

        let params = ListParams {
            offset: Some("-1".into()),
            ..ListParams::default()
        };
        assert!(params.to_query().is_err());
    }

    #[test]
    fn tmdb_flag_values() {
        assert!(tmdb_flag(Some("true"), false));
        assert!(tmdb_flag(Some("1"), false));
        assert!(!tmdb_flag(Some("yes"), true));
        assert!(!tmdb_flag(Some("false"), true));
        assert!(tmdb_flag(None, true));
        assert!(!tmdb_flag(None, false));
    }
}
