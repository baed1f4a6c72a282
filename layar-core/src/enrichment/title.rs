use layar_model::MovieRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d{4})\)\s*$").unwrap());

static TRAILING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d{4}\)\s*$").unwrap());

/// Title as sent to the search endpoint: a trailing `(YYYY)` is removed.
pub fn clean_title(title: &str) -> String {
    TRAILING_YEAR.replace(title, "").trim().to_string()
}

/// Year from a `Title (YYYY)` suffix.
pub fn year_from_title(title: &str) -> Option<u16> {
    YEAR_SUFFIX
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Stored year when it is numeric. `"nan"` and other placeholders count as
/// absent.
pub fn stored_year(raw: Option<&str>) -> Option<u16> {
    let raw = raw?.trim();
    if let Ok(year) = raw.parse::<u16>() {
        return Some(year);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && *v >= 0.0)
        .and_then(|v| u16::try_from(v as u64).ok())
}

/// Year used to narrow the provider search: stored year first, title
/// suffix second.
pub fn match_year(record: &MovieRecord) -> Option<u16> {
    stored_year(record.year_text().as_deref())
        .or_else(|| record.title_str().and_then(year_from_title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_strips_year_suffix() {
        assert_eq!(clean_title("Tron: Ares (2025)"), "Tron: Ares");
        assert_eq!(clean_title("Tron: Ares (2025)  "), "Tron: Ares");
        assert_eq!(clean_title("  Heat  "), "Heat");
        assert_eq!(clean_title("1917 (2019)"), "1917");
        assert_eq!(clean_title("(2019) Intro"), "(2019) Intro");
        assert_eq!(clean_title("Blade Runner 2049"), "Blade Runner 2049");
    }

    #[test]
    fn test_year_from_title() {
        assert_eq!(year_from_title("Tron: Ares (2025)"), Some(2025));
        assert_eq!(year_from_title("Tron: Ares (2025) "), Some(2025));
        assert_eq!(year_from_title("Blade Runner 2049"), None);
        assert_eq!(year_from_title("Heat (95)"), None);
        assert_eq!(year_from_title("(1999) Remastered"), None);
    }

    #[test]
    fn test_stored_year() {
        assert_eq!(stored_year(Some("2025")), Some(2025));
        assert_eq!(stored_year(Some(" 1999 ")), Some(1999));
        assert_eq!(stored_year(Some("2001.0")), Some(2001));
        assert_eq!(stored_year(Some("nan")), None);
        assert_eq!(stored_year(Some("TBA")), None);
        assert_eq!(stored_year(Some("")), None);
        assert_eq!(stored_year(None), None);
    }

    #[test]
    fn test_match_year_prefers_stored_year() {
        let mut record = MovieRecord::new("tron-ares", "Tron: Ares (2025)");
        assert_eq!(match_year(&record), Some(2025));

        record.year = Some("2024".into());
        assert_eq!(match_year(&record), Some(2024));

        record.year = Some("nan".into());
        assert_eq!(match_year(&record), Some(2025));

        record.title = Some("Tron: Ares".into());
        assert_eq!(match_year(&record), None);
    }
}
