use crate::database::types::{LibraryEntry, ReadingStatistics};

/// Number of categories reported in [`ReadingStatistics::top_categories`].
pub const TOP_CATEGORIES: usize = 3;

/// Aggregates a user's library and queue size into reading statistics.
///
/// The average divides the sum of ratings by the number of library entries, so unrated books
/// pull the average down as if rated 0.
#[must_use]
#[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
pub fn summarize(entries: &[LibraryEntry], pending_count: usize) -> ReadingStatistics {
    ReadingStatistics {
        total_books: entries.len(),
        pending_count,
        average_rating: average_rating(entries),
        top_categories: top_categories(entries, TOP_CATEGORIES),
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::as_conversions,
    reason = "Library sizes are far below f64 precision limits"
)]
fn average_rating(entries: &[LibraryEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let sum: i64 = entries.iter().map(|entry| entry.rating.unwrap_or(0)).sum();
    sum as f64 / entries.len() as f64
}

/// Counts every category occurrence and keeps the `limit` most frequent. Ties keep the order in
/// which the categories were first seen.
fn top_categories(entries: &[LibraryEntry], limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for category in entries.iter().flat_map(|entry| entry.categories.iter()) {
        match counts.iter_mut().find(|(name, _)| name == category) {
            Some((_, count)) => *count += 1,
            None => counts.push((category.clone(), 1)),
        }
    }
    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(id: &str, rating: Option<i64>, categories: &[&str]) -> LibraryEntry {
        let mut entry = LibraryEntry::new(
            1,
            id.to_owned(),
            format!("Book {id}"),
            vec!["Someone".to_owned()],
            categories.iter().map(|c| (*c).to_owned()).collect(),
        );
        entry.rating = rating;
        entry
    }

    #[test]
    fn empty_library_has_zeroed_statistics() {
        let stats = summarize(&[], 0);
        assert_eq!(stats.total_books, 0);
        assert_eq!(stats.pending_count, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert!(stats.top_categories.is_empty());
    }

    #[test]
    fn unrated_books_count_towards_the_average() {
        let entries = [
            entry("a", Some(8), &["Fiction", "Drama"]),
            entry("b", None, &["Fiction"]),
        ];
        let stats = summarize(&entries, 4);
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.pending_count, 4);
        assert_eq!(stats.average_rating, 4.0);
        assert_eq!(
            stats.top_categories,
            vec![("Fiction".to_owned(), 2), ("Drama".to_owned(), 1)]
        );
    }

    #[test]
    fn ties_keep_first_seen_order_and_are_capped() {
        let entries = [
            entry("a", Some(5), &["Poetry", "History"]),
            entry("b", Some(7), &["Science", "History"]),
            entry("c", None, &["Essay", "Poetry"]),
            entry("d", None, &["Essay"]),
        ];
        let stats = summarize(&entries, 0);
        assert_eq!(
            stats.top_categories,
            vec![
                ("Poetry".to_owned(), 2),
                ("History".to_owned(), 2),
                ("Essay".to_owned(), 2),
            ]
        );
        assert_eq!(stats.average_rating, 3.0);
    }
}
