use layar_model::{
    CastCredit, EnrichedMovie, MovieRecord, TmdbMovieDetails, Trailer,
};

use crate::providers::{BackdropSize, ImageBase, PosterSize, ProfileSize};

pub const MAX_CAST: usize = 10;
pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Merges TMDB details into a local record using the default image host.
pub fn map_provider_to_local(
    local: &MovieRecord,
    details: &TmdbMovieDetails,
) -> EnrichedMovie {
    map_with_images(local, details, &ImageBase::default())
}

/// Pure merge of a provider record onto a local one.
///
/// Local fields are carried over untouched except for keys enrichment owns,
/// which are dropped from the carried-over extras so the fresh values win.
pub fn map_with_images(
    local: &MovieRecord,
    details: &TmdbMovieDetails,
    images: &ImageBase,
) -> EnrichedMovie {
    let mut carried = local.clone();
    for key in EnrichedMovie::FIELDS {
        carried.extra.remove(key);
    }

    let credits = details.credits.as_ref();

    let tmdb_director = credits
        .and_then(|credits| {
            credits
                .crew
                .iter()
                .find(|member| member.job == "Director")
        })
        .map(|member| member.name.clone())
        .filter(|name| !name.is_empty())
        .or_else(|| local.director.clone());

    let tmdb_cast = credits
        .map(|credits| {
            credits
                .cast
                .iter()
                .take(MAX_CAST)
                .map(|member| CastCredit {
                    name: member.name.clone(),
                    character: member.character.clone(),
                    profile_path: image_path(member.profile_path.as_deref())
                        .map(|path| images.profile(path, ProfileSize::W500)),
                })
                .collect()
        })
        .unwrap_or_default();

    let tmdb_trailers = details
        .videos
        .as_ref()
        .map(|videos| {
            videos
                .results
                .iter()
                .filter(|video| video.kind == "Trailer" && video.site == "YouTube")
                .map(|video| Trailer {
                    key: video.key.clone(),
                    name: video.name.clone(),
                    kind: video.kind.clone(),
                    youtube_url: format!("{YOUTUBE_WATCH_URL}{}", video.key),
                })
                .collect()
        })
        .unwrap_or_default();

    EnrichedMovie {
        players: local.players.clone(),
        tmdb_id: details.id,
        tmdb_title: details.title.clone(),
        tmdb_overview: details
            .overview
            .clone()
            .filter(|overview| !overview.is_empty())
            .or_else(|| local.synopsis.clone()),
        tmdb_rating: details.vote_average,
        tmdb_vote_count: details.vote_count,
        tmdb_release_date: details.release_date.clone(),
        tmdb_runtime: details.runtime,
        tmdb_genres: details.genres.iter().map(|g| g.name.clone()).collect(),
        tmdb_production_countries: details
            .production_countries
            .iter()
            .map(|c| c.name.clone())
            .collect(),
        tmdb_director,
        tmdb_cast,
        tmdb_poster: image_path(details.poster_path.as_deref())
            .map(|path| images.poster(path, PosterSize::W500))
            .or_else(|| local.poster_url.clone()),
        tmdb_backdrop: image_path(details.backdrop_path.as_deref())
            .map(|path| images.backdrop(path, BackdropSize::Original)),
        tmdb_trailers,
        local: carried,
    }
}

/// TMDB sends `""` as well as `null` for a missing image.
fn image_path(path: Option<&str>) -> Option<&str> {
    path.filter(|path| !path.is_empty())
}
