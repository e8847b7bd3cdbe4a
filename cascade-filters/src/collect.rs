use crate::gate::{await_idle, GateConfig};
use cascade_common::{CascadeError, Result};
use cascade_drivers::PageDriver;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Ordered (level id, label) choices. A complete set covering every level is
/// a [`FilterChain`](crate::chains::FilterChain).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selections {
    entries: Vec<(String, String)>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the choice for `level`. Replacing keeps the original position.
    pub fn with(mut self, level: impl Into<String>, label: impl Into<String>) -> Self {
        self.insert(level, label);
        self
    }

    pub fn insert(&mut self, level: impl Into<String>, label: impl Into<String>) {
        let (level, label) = (level.into(), label.into());
        match self.entries.iter_mut().find(|(l, _)| *l == level) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((level, label)),
        }
    }

    pub fn get(&self, level: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == level)
            .map(|(_, label)| label.as_str())
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Selections
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut selections = Selections::new();
        for (level, label) in iter {
            selections.insert(level, label);
        }
        selections
    }
}

impl fmt::Display for Selections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (level, label)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" / ")?;
            }
            write!(f, "{level}={label}")?;
        }
        Ok(())
    }
}

impl Serialize for Selections {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (level, label) in &self.entries {
            map.serialize_entry(level, label)?;
        }
        map.end()
    }
}

/// Options rendered for one dropdown level at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownLevel {
    pub id: String,
    pub options: Vec<String>,
}

/// Result of [`collect`]: the levels that were read, in level order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedOptions {
    levels: Vec<DropdownLevel>,
}

impl CollectedOptions {
    pub fn get(&self, level: &str) -> Option<&[String]> {
        self.levels
            .iter()
            .find(|l| l.id == level)
            .map(|l| l.options.as_slice())
    }

    pub fn levels(&self) -> &[DropdownLevel] {
        &self.levels
    }

    /// Id of the deepest level that was read.
    pub fn last_level(&self) -> Option<&str> {
        self.levels.last().map(|l| l.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn into_map(self) -> HashMap<String, Vec<String>> {
        self.levels.into_iter().map(|l| (l.id, l.options)).collect()
    }
}

impl Serialize for CollectedOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for level in &self.levels {
            map.serialize_entry(&level.id, &level.options)?;
        }
        map.end()
    }
}

/// Walk dependent dropdown `levels` in order.
///
/// Each level's options are read and recorded. When `selections` names a
/// label for the level it is selected and the gate awaited before the next
/// level is read; a level without a selection ends the walk, since the
/// levels below it depend on the missing choice.
///
/// A label absent from the rendered options fails with
/// [`CascadeError::SelectionNotFound`] before anything is selected.
pub async fn collect<L: AsRef<str>>(
    driver: &dyn PageDriver,
    levels: &[L],
    selections: &Selections,
    gate: &GateConfig,
) -> Result<CollectedOptions> {
    let mut collected = CollectedOptions::default();

    for level in levels {
        let level = level.as_ref();
        let options = driver.list_options(level).await?;
        debug!(target: "cascade.collect", %level, count = options.len(), "read options");

        let choice = selections.get(level).map(str::trim);
        let offered = choice.map(|label| options.iter().any(|o| o == label));
        collected.levels.push(DropdownLevel {
            id: level.to_string(),
            options,
        });

        let Some(label) = choice else {
            debug!(target: "cascade.collect", %level, "no selection; stopping");
            break;
        };
        if offered != Some(true) {
            return Err(CascadeError::selection_not_found(level, label));
        }

        driver.select_option(level, label).await?;
        await_idle(driver, gate).await?;
    }

    Ok(collected)
}
