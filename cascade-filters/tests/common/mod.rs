#![allow(dead_code)]

use async_trait::async_trait;
use cascade_common::{CascadeError, Result};
use cascade_drivers::{PageDriver, Record, RecordSource};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Scripted page: options depend on the selections made so far, indicators
/// stay visible for a fixed number of polls, and the result table has a
/// fixed set of pages.
#[derive(Default)]
pub struct FakePage {
    options: HashMap<String, Vec<String>>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    selected: Vec<(String, String)>,
    /// Indicator → remaining polls it reports visible (`usize::MAX` = forever).
    busy: HashMap<String, usize>,
    busy_after_select: Option<(String, usize)>,
    pages: Vec<Vec<Record>>,
    page: usize,
    /// Level → number of times its options were listed.
    lists: HashMap<String, usize>,
    /// (level, label, listings after which the label disappears).
    withdrawn: Vec<(String, String, usize)>,
    failing_indicator: Option<String>,
    calls: Vec<String>,
    sleeps: Vec<Duration>,
}

fn key(level: &str, parents: &[&str]) -> String {
    format!("{level}|{}", parents.join("/"))
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options shown for `level` once `parents` have been selected above it.
    pub fn with_options(mut self, level: &str, parents: &[&str], options: &[&str]) -> Self {
        self.options.insert(
            key(level, parents),
            options.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    pub fn with_busy(self, indicator: &str, polls: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .busy
            .insert(indicator.to_string(), polls);
        self
    }

    /// After every selection, `indicator` shows for `polls` polls.
    pub fn with_busy_after_select(self, indicator: &str, polls: usize) -> Self {
        self.state.lock().unwrap().busy_after_select = Some((indicator.to_string(), polls));
        self
    }

    /// `label` stops being offered at `level` once the level's options have
    /// been listed `after` times.
    pub fn withdraw_after(self, level: &str, label: &str, after: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .withdrawn
            .push((level.to_string(), label.to_string(), after));
        self
    }

    /// Querying `indicator` fails as if the browser session had gone away.
    pub fn with_failing_indicator(self, indicator: &str) -> Self {
        self.state.lock().unwrap().failing_indicator = Some(indicator.to_string());
        self
    }

    pub fn with_pages(self, pages: Vec<Vec<Record>>) -> Self {
        self.state.lock().unwrap().pages = pages;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }

    pub fn selected(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().selected.clone()
    }

    fn current_options(&self, state: &State, level: &str) -> Vec<String> {
        let parents: Vec<&str> = state
            .selected
            .iter()
            .filter(|(l, _)| l != level)
            .map(|(_, label)| label.as_str())
            .collect();
        let listed = state.lists.get(level).copied().unwrap_or(0);
        let mut options = self
            .options
            .get(&key(level, &parents))
            .cloned()
            .unwrap_or_default();
        options.retain(|option| {
            !state
                .withdrawn
                .iter()
                .any(|(l, label, after)| l == level && label == option && listed > *after)
        });
        options
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn list_options(&self, level: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list:{level}"));
        *state.lists.entry(level.to_string()).or_default() += 1;
        Ok(self.current_options(&state, level))
    }

    async fn is_visible(&self, indicator: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("visible:{indicator}"));
        if state.failing_indicator.as_deref() == Some(indicator) {
            return Err(anyhow::anyhow!("session gone").into());
        }
        match state.busy.get_mut(indicator) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn select_option(&self, level: &str, label: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("select:{level}={label}"));
        if !self.current_options(&state, level).iter().any(|o| o == label) {
            return Err(CascadeError::selection_not_found(level, label));
        }
        state.selected.retain(|(l, _)| l != level);
        state.selected.push((level.to_string(), label.to_string()));
        if let Some((indicator, polls)) = state.busy_after_select.clone() {
            state.busy.insert(indicator, polls);
        }
        Ok(())
    }

    async fn clear_selection(&self, level: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("clear:{level}"));
        state.selected.retain(|(l, _)| l != level);
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        self.state.lock().unwrap().sleeps.push(duration);
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl RecordSource for FakePage {
    async fn read_records(&self) -> Result<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        let page = state.page;
        state.calls.push(format!("read:{page}"));
        Ok(state.pages.get(page).cloned().unwrap_or_default())
    }

    async fn goto_last_page(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("last-page".to_string());
        if state.pages.len() < 2 {
            return Ok(false);
        }
        state.page = state.pages.len() - 1;
        Ok(true)
    }

    async fn goto_next_page(&self) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("next-page".to_string());
        if state.page + 1 >= state.pages.len() {
            return Ok(false);
        }
        state.page += 1;
        Ok(true)
    }
}

/// Country → region → city hierarchy used across tests.
pub fn geography() -> FakePage {
    FakePage::new()
        .with_options("country", &[], &["US", "FR"])
        .with_options("region", &["US"], &["CA", "NY"])
        .with_options("region", &["FR"], &["IDF"])
        .with_options("city", &["US", "CA"], &["LA", "SF", "SD"])
        .with_options("city", &["US", "NY"], &["NYC"])
        .with_options("city", &["FR", "IDF"], &["Paris"])
}

pub fn record(country: &str, region: &str, city: &str) -> Record {
    Record::new()
        .with_field("name", format!("{city} store"))
        .with_field("country", country)
        .with_field("region", region)
        .with_field("city", city)
}
