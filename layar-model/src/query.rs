use serde::{Deserialize, Serialize};

use crate::movie::MovieRecord;

pub const DEFAULT_LIMIT: usize = 50;

/// Filter, sort and pagination options for listing the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieQuery {
    /// Case-insensitive substring over title, slug and synopsis.
    pub search: Option<String>,
    /// Case-insensitive substring over the genre column.
    pub genre: Option<String>,
    /// Exact match on the stored year string.
    pub tahun: Option<String>,
    pub min_rating: Option<f64>,
    pub limit: usize,
    pub offset: usize,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl Default for MovieQuery {
    fn default() -> Self {
        Self {
            search: None,
            genre: None,
            tahun: None,
            min_rating: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

impl MovieQuery {
    /// Every record, in the store's natural order.
    pub fn everything() -> Self {
        Self {
            limit: usize::MAX,
            sort_by: SortField::Natural,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Rating,
    #[serde(rename = "tahun")]
    Year,
    /// Whatever order the backing store yields (file order for the bundled
    /// dataset, import order for Redis, newest first for Postgres).
    Natural,
}

impl SortField {
    pub fn from_param(value: &str) -> Self {
        match value {
            "rating" => SortField::Rating,
            "tahun" => SortField::Year,
            _ => SortField::Natural,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    /// `desc` is the only spelling that sorts descending.
    pub fn from_param(value: &str) -> Self {
        if value == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Desc => "DESC",
            SortOrder::Asc => "ASC",
        }
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MoviePage {
    pub movies: Vec<MovieRecord>,
    /// Matches after filtering, before pagination.
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_params() {
        assert_eq!(SortField::from_param("rating"), SortField::Rating);
        assert_eq!(SortField::from_param("tahun"), SortField::Year);
        assert_eq!(SortField::from_param("judul"), SortField::Natural);

        assert_eq!(SortOrder::from_param("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::from_param("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::from_param("DESC"), SortOrder::Asc);
    }

    #[test]
    fn test_default_query() {
        let query = MovieQuery::default();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort_by, SortField::Rating);
        assert_eq!(query.order, SortOrder::Desc);
    }
}
