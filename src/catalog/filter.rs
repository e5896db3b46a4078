use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::db::enums::CompanionTheme;
use crate::db::models::CompanionRecord;

/// Theme facet of the gallery sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeFilter {
    #[default]
    All,
    Only(CompanionTheme),
}

impl ThemeFilter {
    pub fn admits(&self, theme: CompanionTheme) -> bool {
        match self {
            ThemeFilter::All => true,
            ThemeFilter::Only(wanted) => *wanted == theme,
        }
    }
}

impl FromStr for ThemeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("all") {
            return Ok(ThemeFilter::All);
        }
        s.parse::<CompanionTheme>().map(ThemeFilter::Only)
    }
}

impl fmt::Display for ThemeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeFilter::All => f.write_str("all"),
            ThemeFilter::Only(theme) => theme.fmt(f),
        }
    }
}

impl Serialize for ThemeFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThemeFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Descending like count.
    #[default]
    Popular,
    /// Descending creation timestamp.
    Newest,
    /// Descending rating.
    Rating,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Popular => "popular",
            SortKey::Newest => "newest",
            SortKey::Rating => "rating",
        }
    }

    pub fn compare(&self, a: &CompanionRecord, b: &CompanionRecord) -> Ordering {
        let (a, b) = (&a.companion, &b.companion);
        match self {
            SortKey::Popular => b.likes.cmp(&a.likes),
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Rating => b.rating.total_cmp(&a.rating),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "popular" => Ok(SortKey::Popular),
            "newest" => Ok(SortKey::Newest),
            "rating" => Ok(SortKey::Rating),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// Everything the main gallery view filters and sorts by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub theme: ThemeFilter,
    #[serde(default)]
    pub tag_ids: BTreeSet<String>,
    #[serde(default)]
    pub sort: SortKey,
}

impl CatalogQuery {
    /// Canonical text of every filter and sort input. Two queries have the
    /// same key exactly when they are equal.
    pub fn key(&self) -> String {
        let tags: Vec<String> = self
            .tag_ids
            .iter()
            .map(|id| urlencoding::encode(id).into_owned())
            .collect();
        format!(
            "{}|{}|{}|{}",
            self.sort.as_str(),
            self.theme,
            tags.join(","),
            urlencoding::encode(&self.text),
        )
    }

    /// Name substring (case-insensitive) AND theme AND any-of the selected tags.
    pub fn matches(&self, record: &CompanionRecord) -> bool {
        let needle = self.text.to_lowercase();
        let name_matches = record.companion.name.to_lowercase().contains(&needle);
        let theme_matches = self.theme.admits(record.companion.theme);
        let tags_match = self.tag_ids.is_empty()
            || record.tags.iter().any(|tag| self.tag_ids.contains(&tag.id));
        name_matches && theme_matches && tags_match
    }
}

/// Records satisfying `query`, in input order.
pub fn filter_companions<'a>(
    records: &'a [CompanionRecord],
    query: &CatalogQuery,
) -> Vec<&'a CompanionRecord> {
    records.iter().filter(|record| query.matches(record)).collect()
}

/// Stable sort: records comparing equal keep their relative input order.
pub fn sort_companions(records: &mut [&CompanionRecord], key: SortKey) {
    records.sort_by(|a, b| key.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{record, record_with_tags};

    fn names(records: &[&CompanionRecord]) -> Vec<String> {
        records.iter().map(|r| r.companion.name.clone()).collect()
    }

    fn base() -> Vec<CompanionRecord> {
        vec![
            record("Business Strategist Pro", CompanionTheme::Professional, 8901, 4.8, "2024-01-15"),
            record("Creative Muse", CompanionTheme::Casual, 7234, 4.9, "2024-01-20"),
            record("Tech Guru", CompanionTheme::Professional, 6789, 4.7, "2024-02-01"),
        ]
    }

    #[test]
    fn popular_sort_orders_by_likes_descending() {
        let records = base();
        let mut view = filter_companions(&records, &CatalogQuery::default());
        sort_companions(&mut view, SortKey::Popular);
        let likes: Vec<i64> = view.iter().map(|r| r.companion.likes).collect();
        assert_eq!(likes, vec![8901, 7234, 6789]);
    }

    #[test]
    fn text_query_matches_name_case_insensitively_regardless_of_sort() {
        let records = base();
        let query = CatalogQuery { text: "creative".to_string(), ..Default::default() };
        for key in [SortKey::Popular, SortKey::Newest, SortKey::Rating] {
            let mut view = filter_companions(&records, &query);
            sort_companions(&mut view, key);
            assert_eq!(names(&view), vec!["Creative Muse".to_string()]);
        }
    }

    #[test]
    fn query_does_not_match_description() {
        let mut records = base();
        records[0].companion.description = "creative strategy".to_string();
        let query = CatalogQuery { text: "CREATIVE".to_string(), ..Default::default() };
        assert_eq!(names(&filter_companions(&records, &query)), vec!["Creative Muse".to_string()]);
    }

    #[test]
    fn theme_filter_keeps_only_that_theme() {
        let records = base();
        let query = CatalogQuery {
            theme: ThemeFilter::Only(CompanionTheme::Professional),
            ..Default::default()
        };
        assert_eq!(
            names(&filter_companions(&records, &query)),
            vec!["Business Strategist Pro".to_string(), "Tech Guru".to_string()]
        );
    }

    #[test]
    fn tag_filter_uses_any_of_semantics() {
        let records = vec![
            record_with_tags("Only A", &["A"]),
            record_with_tags("Only C", &["C"]),
            record_with_tags("A and B", &["A", "B"]),
            record_with_tags("Untagged", &[]),
        ];
        let query = CatalogQuery {
            tag_ids: ["A", "B"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        assert_eq!(
            names(&filter_companions(&records, &query)),
            vec!["Only A".to_string(), "A and B".to_string()]
        );
    }

    #[test]
    fn all_three_predicates_must_hold() {
        let mut records = vec![
            record_with_tags("Dragon Keeper", &["lore"]),
            record_with_tags("Dragon Coach", &["lore"]),
            record_with_tags("Dragon Scholar", &["history"]),
        ];
        records[0].companion.theme = CompanionTheme::Fantasy;
        records[1].companion.theme = CompanionTheme::Professional;
        records[2].companion.theme = CompanionTheme::Fantasy;

        let query = CatalogQuery {
            text: "dragon".to_string(),
            theme: ThemeFilter::Only(CompanionTheme::Fantasy),
            tag_ids: ["lore".to_string()].into_iter().collect(),
            sort: SortKey::Popular,
        };
        let once = filter_companions(&records, &query);
        assert_eq!(names(&once), vec!["Dragon Keeper".to_string()]);

        let owned: Vec<CompanionRecord> = once.into_iter().cloned().collect();
        let twice = filter_companions(&owned, &query);
        assert_eq!(names(&twice), vec!["Dragon Keeper".to_string()]);
    }

    #[test]
    fn ties_keep_input_order() {
        let records = vec![
            record("First", CompanionTheme::Casual, 10, 4.5, "2024-03-01"),
            record("Second", CompanionTheme::Casual, 10, 4.5, "2024-03-01"),
            record("Third", CompanionTheme::Casual, 20, 4.5, "2024-03-01"),
            record("Fourth", CompanionTheme::Casual, 10, 4.5, "2024-03-01"),
        ];
        for key in [SortKey::Popular, SortKey::Newest, SortKey::Rating] {
            let mut view = filter_companions(&records, &CatalogQuery::default());
            sort_companions(&mut view, key);
            let expected = match key {
                SortKey::Popular => vec!["Third", "First", "Second", "Fourth"],
                _ => vec!["First", "Second", "Third", "Fourth"],
            };
            assert_eq!(names(&view), expected);
        }
    }

    #[test]
    fn newest_and_rating_sorts_descend() {
        let records = base();
        let mut view = filter_companions(&records, &CatalogQuery::default());
        sort_companions(&mut view, SortKey::Newest);
        assert_eq!(view[0].companion.name, "Tech Guru");

        sort_companions(&mut view, SortKey::Rating);
        let ratings: Vec<f64> = view.iter().map(|r| r.companion.rating).collect();
        assert_eq!(ratings, vec![4.9, 4.8, 4.7]);
    }

    #[test]
    fn filter_parsing() {
        assert_eq!("all".parse::<ThemeFilter>(), Ok(ThemeFilter::All));
        assert_eq!("".parse::<ThemeFilter>(), Ok(ThemeFilter::All));
        assert_eq!(
            "fantasy".parse::<ThemeFilter>(),
            Ok(ThemeFilter::Only(CompanionTheme::Fantasy))
        );
        assert_eq!("rating".parse::<SortKey>(), Ok(SortKey::Rating));
        assert!("cheapest".parse::<SortKey>().is_err());
    }

    #[test]
    fn query_key_changes_with_every_input() {
        let base = CatalogQuery::default();
        assert_eq!(base.key(), "popular|all||");
        let variants = [
            CatalogQuery { text: "guru|x".to_string(), ..Default::default() },
            CatalogQuery { theme: ThemeFilter::Only(CompanionTheme::Casual), ..Default::default() },
            CatalogQuery { tag_ids: ["a,b".to_string()].into_iter().collect(), ..Default::default() },
            CatalogQuery {
                tag_ids: ["a".to_string(), "b".to_string()].into_iter().collect(),
                ..Default::default()
            },
            CatalogQuery { sort: SortKey::Rating, ..Default::default() },
        ];
        for (i, variant) in variants.iter().enumerate() {
            assert_ne!(variant.key(), base.key());
            for other in &variants[i + 1..] {
                assert_ne!(variant.key(), other.key());
            }
        }
    }
}
