//! Filter, sort and paginate over records held in memory.
//!
//! The bundled and Redis stores evaluate queries here; the Postgres store
//! mirrors the same rules in SQL.

use layar_model::{MoviePage, MovieQuery, MovieRecord, SortField, SortOrder};
use std::cmp::Ordering;

/// Applies `query` to `records`, which must already be in the store's
/// natural order.
pub fn apply(records: Vec<MovieRecord>, query: &MovieQuery) -> MoviePage {
    let mut matched: Vec<MovieRecord> =
        records.into_iter().filter(|r| matches(r, query)).collect();

    sort(&mut matched, query.sort_by, query.order);

    let total = matched.len() as u64;
    let movies = matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();

    MoviePage {
        movies,
        total,
        limit: query.limit,
        offset: query.offset,
    }
}

pub fn matches(record: &MovieRecord, query: &MovieQuery) -> bool {
    let Some(title) = record.title.as_deref() else {
        return false;
    };

    if let Some(needle) = non_blank(query.search.as_deref()) {
        let needle = needle.to_lowercase();
        let hit = contains_folded(title, &needle)
            || contains_folded(&record.slug, &needle)
            || record
                .synopsis
                .as_deref()
                .is_some_and(|s| contains_folded(s, &needle));
        if !hit {
            return false;
        }
    }

    if let Some(genre) = non_blank(query.genre.as_deref()) {
        let genre = genre.to_lowercase();
        if !record
            .genre
            .as_deref()
            .is_some_and(|g| contains_folded(g, &genre))
        {
            return false;
        }
    }

    if let Some(tahun) = non_blank(query.tahun.as_deref())
        && record.year_text().as_deref() != Some(tahun)
    {
        return false;
    }

    if let Some(min) = query.min_rating
        && !record.rating_value().is_some_and(|rating| rating >= min)
    {
        return false;
    }

    true
}

/// Stable sort; ties keep natural order.
pub fn sort(records: &mut [MovieRecord], field: SortField, order: SortOrder) {
    let compare: fn(&MovieRecord, &MovieRecord) -> Ordering = match field {
        SortField::Rating => |a, b| rating_key(a).total_cmp(&rating_key(b)),
        SortField::Year => |a, b| year_key(a).cmp(&year_key(b)),
        SortField::Natural => return,
    };

    match order {
        SortOrder::Asc => records.sort_by(compare),
        SortOrder::Desc => records.sort_by(|a, b| compare(b, a)),
    }
}

fn rating_key(record: &MovieRecord) -> f64 {
    record.rating_value().unwrap_or(0.0)
}

fn year_key(record: &MovieRecord) -> u16 {
    record.year_text().as_deref().map_or(0, year_sort_key)
}

/// Sort key for `tahun`: one to four digits, surrounding whitespace
/// ignored, anything else is 0. The Postgres store uses the same rule.
pub fn year_sort_key(tahun: &str) -> u16 {
    let tahun = tahun.trim();
    if (1..=4).contains(&tahun.len()) && tahun.bytes().all(|b| b.is_ascii_digit())
    {
        tahun.parse().unwrap_or(0)
    } else {
        0
    }
}

fn contains_folded(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(slug: &str, title: &str, year: &str, rating: Option<f64>) -> MovieRecord {
        let mut record = MovieRecord::new(slug, title);
        record.year = Some(year.into());
        record.rating = rating.map(Into::into);
        record.genre = Some("Action, Drama".into());
        record
    }

    fn catalog() -> Vec<MovieRecord> {
        let mut untitled = movie("untitled", "", "2020", Some(9.9));
        untitled.title = None;
        let mut quiet = movie("quiet-place", "A Quiet Place", "2018", Some(7.5));
        quiet.genre = Some("Horror".into());
        quiet.synopsis = Some("A family must live in silence.".into());

        vec![
            movie("heat", "Heat", "1995", Some(8.3)),
            untitled,
            quiet,
            movie("ronin", "Ronin", "nan", None),
            movie("collateral", "Collateral", "2004", Some(7.5)),
        ]
    }

    fn slugs(page: &MoviePage) -> Vec<&str> {
        page.movies.iter().map(|m| m.slug.as_str()).collect()
    }

    #[test]
    fn test_untitled_records_are_excluded() {
        let page = apply(catalog(), &MovieQuery::default());
        assert_eq!(page.total, 4);
        assert!(!slugs(&page).contains(&"untitled"));
    }

    #[test]
    fn test_rating_desc_is_default_and_stable() {
        let page = apply(catalog(), &MovieQuery::default());
        assert_eq!(slugs(&page), vec!["heat", "quiet-place", "collateral", "ronin"]);
    }

    #[test]
    fn test_year_sort_treats_non_numeric_as_zero() {
        let query = MovieQuery {
            sort_by: SortField::Year,
            order: SortOrder::Asc,
            ..MovieQuery::default()
        };
        let page = apply(catalog(), &query);
        assert_eq!(slugs(&page), vec!["ronin", "heat", "collateral", "quiet-place"]);
    }

    #[test]
    fn test_natural_order() {
        let query = MovieQuery {
            sort_by: SortField::Natural,
            ..MovieQuery::default()
        };
        let page = apply(catalog(), &query);
        assert_eq!(slugs(&page), vec!["heat", "quiet-place", "ronin", "collateral"]);
    }

    #[test]
    fn test_search_covers_title_slug_and_synopsis() {
        let by = |needle: &str| {
            let query = MovieQuery {
                search: Some(needle.into()),
                ..MovieQuery::default()
            };
            apply(catalog(), &query)
        };
        assert_eq!(slugs(&by("HEAT")), vec!["heat"]);
        assert_eq!(slugs(&by("quiet-pl")), vec!["quiet-place"]);
        assert_eq!(slugs(&by("silence")), vec!["quiet-place"]);
        assert_eq!(by("nothing here").total, 0);
    }

    #[test]
    fn test_filters() {
        let query = MovieQuery {
            genre: Some("horror".into()),
            ..MovieQuery::default()
        };
        assert_eq!(slugs(&apply(catalog(), &query)), vec!["quiet-place"]);

        let query = MovieQuery {
            tahun: Some("2004".into()),
            ..MovieQuery::default()
        };
        assert_eq!(slugs(&apply(catalog(), &query)), vec!["collateral"]);

        let query = MovieQuery {
            min_rating: Some(7.5),
            ..MovieQuery::default()
        };
        assert_eq!(
            slugs(&apply(catalog(), &query)),
            vec!["heat", "quiet-place", "collateral"]
        );
    }

    #[test]
    fn test_pagination_reports_total_before_paging() {
        let query = MovieQuery {
            limit: 2,
            offset: 1,
            ..MovieQuery::default()
        };
        let page = apply(catalog(), &query);
        assert_eq!(page.total, 4);
        assert_eq!(page.limit, 2);
        assert_eq!(page.offset, 1);
        assert_eq!(slugs(&page), vec!["quiet-place", "collateral"]);

        let query = MovieQuery {
            offset: 10,
            ..MovieQuery::default()
        };
        let page = apply(catalog(), &query);
        assert_eq!(page.total, 4);
        assert!(page.movies.is_empty());
    }

    #[test]
    fn test_blank_titles_are_still_listed() {
        let mut blank = movie("blank", "", "2021", Some(5.0));
        blank.title = Some("  ".into());
        let page = apply(vec![blank], &MovieQuery::default());
        assert_eq!(slugs(&page), vec!["blank"]);
    }

    #[test]
    fn test_year_sort_key_accepts_at_most_four_digits() {
        assert_eq!(year_sort_key("1995"), 1995);
        assert_eq!(year_sort_key(" 2004 "), 2004);
        assert_eq!(year_sort_key("95"), 95);
        assert_eq!(year_sort_key("99999999999"), 0);
        assert_eq!(year_sort_key("2001.0"), 0);
        assert_eq!(year_sort_key("nan"), 0);
        assert_eq!(year_sort_key(""), 0);
    }

    #[test]
    fn test_numeric_and_string_ratings_filter_alike() {
        let mut numeric = movie("numeric", "Numeric", "2000", None);
        numeric.rating = Some(serde_json::json!(8));
        let mut text = movie("text", "Text", "2000", None);
        text.rating = Some(serde_json::json!("7.9"));
        let mut placeholder = movie("placeholder", "Placeholder", "2000", None);
        placeholder.rating = Some(serde_json::json!("N/A"));

        let query = MovieQuery {
            min_rating: Some(7.5),
            ..MovieQuery::default()
        };
        let page = apply(vec![numeric, text, placeholder], &query);
        assert_eq!(slugs(&page), vec!["numeric", "text"]);
    }
}
