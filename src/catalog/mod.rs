//! Discovery pipeline for the public gallery: filter, sort and paginate an
//! in-memory snapshot of companion records. Everything here is synchronous
//! and free of I/O apart from the show-more loading delay.

pub mod filter;
pub mod pagination;
pub mod views;

pub use filter::{filter_companions, sort_companions, CatalogQuery, SortKey, ThemeFilter};
pub use pagination::{Paginator, DEFAULT_PAGE_SIZE, DEFAULT_SHOW_MORE_DELAY};
pub use views::{featured_view, main_view, newest_view, CatalogView, DEFAULT_NEWEST_COUNT};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, NaiveDate, Utc};

    use crate::db::entities::companion;
    use crate::db::enums::CompanionTheme;
    use crate::db::models::{CompanionRecord, Tag};

    fn day(date: &str) -> DateTime<Utc> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    pub fn record(
        name: &str,
        theme: CompanionTheme,
        likes: i64,
        rating: f64,
        created: &str,
    ) -> CompanionRecord {
        let created_at = day(created);
        CompanionRecord {
            companion: companion::Model {
                id: name.to_lowercase().replace(' ', "-"),
                name: name.to_string(),
                avatar: format!("https://api.dicebear.com/7.x/avataaars/svg?seed={name}"),
                description: format!("{name} description"),
                theme,
                rating,
                companion_link: "https://chat.example.com".to_string(),
                conversations: 0,
                likes,
                dislikes: 0,
                stars: 0,
                featured: false,
                created_at,
                updated_at: created_at,
            },
            tags: Vec::new(),
            user_interaction: None,
        }
    }

    pub fn record_with_tags(name: &str, tag_ids: &[&str]) -> CompanionRecord {
        let mut record = record(name, CompanionTheme::Casual, 0, 4.0, "2024-01-01");
        record.tags = tag_ids
            .iter()
            .map(|id| Tag {
                id: id.to_string(),
                name: id.to_string(),
                category_id: "mood".to_string(),
                created_at: record.companion.created_at,
                category: None,
            })
            .collect();
        record
    }
}
