//! Capabilities the filter logic consumes from a rendered page.
//!
//! Both traits are object safe so callers can pass `&dyn PageDriver`; the
//! WebDriver-backed [`WebDriverPage`](crate::cascade_browser::page::WebDriverPage)
//! implements them for real sessions and tests use scripted fakes.

use async_trait::async_trait;
use cascade_common::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

/// Read and command access to dependent dropdowns and loading indicators.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Labels currently rendered for a dropdown level, in render order.
    async fn list_options(&self, level: &str) -> Result<Vec<String>>;

    /// Whether the loading indicator identified by `indicator` is shown.
    async fn is_visible(&self, indicator: &str) -> Result<bool>;

    /// Select `label` in `level`.
    ///
    /// Returns [`CascadeError::SelectionNotFound`](cascade_common::CascadeError::SelectionNotFound)
    /// when the label is not offered.
    async fn select_option(&self, level: &str, label: &str) -> Result<()>;

    /// Reset any selection made in `level`.
    async fn clear_selection(&self, level: &str) -> Result<()>;

    /// Yield between polls.
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// One result-table row: ordered (column, cell text) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Cell text for `column`, if the row has that column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.push(k, v);
        }
        record
    }
}

// Serialised as a JSON object keyed by column, in column order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Paginated result table.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Rows on the currently displayed page.
    async fn read_records(&self) -> Result<Vec<Record>>;

    /// Jump to the highest numbered page. Returns `false` when there is no
    /// pagination to follow.
    async fn goto_last_page(&self) -> Result<bool>;

    /// Advance one page. Returns `false` when there is no further page.
    async fn goto_next_page(&self) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lookup_by_column() {
        let record: Record = [("name", "Shop A"), ("region", "Dhaka")].into_iter().collect();
        assert_eq!(record.get("region"), Some("Dhaka"));
        assert_eq!(record.get("area"), None);
        assert_eq!(record.fields().count(), 2);
    }

    #[test]
    fn records_compare_by_content() {
        let a = Record::new().with_field("code", "R-1");
        let b = Record::new().with_field("code", "R-1");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
}
