use crate::capability::{PageDriver, Record, RecordSource};
use crate::cascade_browser::pacing::Pacing;
use anyhow::Context;
use async_trait::async_trait;
use cascade_common::{CascadeError, Result};
use fantoccini::{elements::Element, error::CmdError, key::Key, Client, Locator};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Where the result table and its pagination live.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub row_selector: String,
    pub cell_selector: String,
    /// Column names assigned to the leading cells of each row.
    pub columns: Vec<String>,
    pub pagination_selector: String,
    /// XPath of the "next page" button, tried before numbered controls.
    pub next_xpath: String,
}

/// CSS selectors that tie level ids to page elements.
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Level id → selector of the dropdown's text input.
    pub levels: HashMap<String, String>,
    /// Selector matching the options of whichever dropdown is open.
    pub option_selector: String,
    /// How long to wait for options to render after opening a dropdown.
    pub open_timeout: Duration,
    pub table: TableLayout,
}

/// Page wrapper implementing [`PageDriver`] and [`RecordSource`] over a
/// WebDriver session.
pub struct WebDriverPage {
    pub(crate) client: Client,
    pub(crate) layout: PageLayout,
    pub(crate) pacing: Pacing,
}

impl WebDriverPage {
    pub fn new(client: Client, layout: PageLayout, pacing: Pacing) -> Self {
        Self {
            client,
            layout,
            pacing,
        }
    }

    /// Navigate to `url`.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))?;
        Ok(())
    }

    /// Click the first element matching `selector`.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let element = self.wait_for(selector).await?;
        element
            .click()
            .await
            .with_context(|| format!("clicking {selector}"))?;
        Ok(())
    }

    /// Replace the value of the input matching `selector`.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let element = self.wait_for(selector).await?;
        element.clear().await.context("clearing input")?;
        element
            .send_keys(value)
            .await
            .with_context(|| format!("typing into {selector}"))?;
        Ok(())
    }

    /// Return the current page URL.
    pub async fn current_url(&self) -> Result<String> {
        let url = self.client.current_url().await.context("reading url")?;
        Ok(url.to_string())
    }

    async fn wait_for(&self, selector: &str) -> Result<Element> {
        let element = self
            .client
            .wait()
            .at_most(self.layout.open_timeout)
            .for_element(Locator::Css(selector))
            .await
            .with_context(|| format!("waiting for {selector}"))?;
        Ok(element)
    }

    fn level_selector(&self, level: &str) -> Result<&str> {
        self.layout
            .levels
            .get(level)
            .map(String::as_str)
            .ok_or_else(|| CascadeError::Config(format!("no selector configured for level '{level}'")))
    }

    /// Click the level's input and return it together with the options that
    /// rendered. No options within `open_timeout` yields an empty list.
    async fn open_dropdown(&self, level: &str) -> Result<(Element, Vec<(Element, String)>)> {
        let selector = self.level_selector(level)?;
        let input = self.wait_for(selector).await?;
        input
            .click()
            .await
            .with_context(|| format!("opening dropdown '{level}'"))?;
        self.pacing.opened().await;

        let waited = self
            .client
            .wait()
            .at_most(self.layout.open_timeout)
            .for_element(Locator::Css(&self.layout.option_selector))
            .await;
        match waited {
            Ok(_) => {}
            Err(CmdError::WaitTimeout) => {
                debug!(target: "cascade.page", %level, "dropdown opened without options");
                return Ok((input, Vec::new()));
            }
            Err(e) => return Err(anyhow::Error::from(e).context("waiting for options").into()),
        }

        let candidates = self
            .client
            .find_all(Locator::Css(&self.layout.option_selector))
            .await
            .context("listing options")?;

        let mut options = Vec::with_capacity(candidates.len());
        for option in candidates {
            // Options from a previously closed dropdown may still be in the DOM, hidden.
            if !option.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let text = option.text().await.context("reading option text")?;
            let text = text.trim().to_string();
            if !text.is_empty() {
                options.push((option, text));
            }
        }
        Ok((input, options))
    }

    async fn close_dropdown(&self, input: &Element) -> Result<()> {
        let escape = char::from(Key::Escape).to_string();
        if let Err(e) = input.send_keys(&escape).await {
            warn!(target: "cascade.page", error = %e, "escape did not reach dropdown; clicking body");
            self.client
                .find(Locator::Css("body"))
                .await
                .context("locating body")?
                .click()
                .await
                .context("clicking body")?;
        }
        self.pacing.closed().await;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn list_options(&self, level: &str) -> Result<Vec<String>> {
        let (input, options) = self.open_dropdown(level).await?;
        let mut labels: Vec<String> = Vec::with_capacity(options.len());
        for (_, text) in options {
            if !labels.contains(&text) {
                labels.push(text);
            }
        }
        self.close_dropdown(&input).await?;
        debug!(target: "cascade.page", %level, count = labels.len(), "read options");
        Ok(labels)
    }

    async fn is_visible(&self, indicator: &str) -> Result<bool> {
        let matches = self
            .client
            .find_all(Locator::Css(indicator))
            .await
            .with_context(|| format!("querying indicator {indicator}"))?;
        for element in matches {
            // A stale handle means the indicator was removed between queries.
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn select_option(&self, level: &str, label: &str) -> Result<()> {
        let (input, options) = self.open_dropdown(level).await?;
        if let Some((option, _)) = options.into_iter().find(|(_, text)| text == label) {
            option
                .click()
                .await
                .with_context(|| format!("choosing '{label}' in '{level}'"))?;
            self.pacing.selected().await;
            debug!(target: "cascade.page", %level, %label, "selected option");
            return Ok(());
        }
        self.close_dropdown(&input).await?;
        Err(CascadeError::selection_not_found(level, label))
    }

    async fn clear_selection(&self, level: &str) -> Result<()> {
        let selector = self.level_selector(level)?;
        let input = self.wait_for(selector).await?;
        // Select widgets keep their own state; editing the text the way a
        // user would is what resets it. WebDriver `clear` does not.
        input
            .click()
            .await
            .with_context(|| format!("focusing dropdown '{level}'"))?;
        input
            .send_keys(&select_all_and_delete())
            .await
            .with_context(|| format!("clearing dropdown '{level}'"))?;
        self.close_dropdown(&input).await
    }
}

#[async_trait]
impl RecordSource for WebDriverPage {
    async fn read_records(&self) -> Result<Vec<Record>> {
        let table = &self.layout.table;
        let mut rows = self
            .client
            .find_all(Locator::Css(&table.row_selector))
            .await
            .context("listing table rows")?;
        if rows.is_empty() {
            // Tables without a body: every row, minus the header.
            rows = self
                .client
                .find_all(Locator::Css("tr"))
                .await
                .context("listing bare table rows")?
                .into_iter()
                .skip(1)
                .collect();
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let cells = row
                .find_all(Locator::Css(&table.cell_selector))
                .await
                .context("listing row cells")?;
            if cells.len() < table.columns.len() {
                continue;
            }
            let mut record = Record::new();
            for (column, cell) in table.columns.iter().zip(cells.iter()) {
                let text = cell.text().await.context("reading cell text")?;
                record.push(column.clone(), text.trim());
            }
            records.push(record);
        }
        debug!(target: "cascade.page", count = records.len(), "read table page");
        Ok(records)
    }

    async fn goto_last_page(&self) -> Result<bool> {
        let last = self
            .numbered_controls()
            .await?
            .into_iter()
            .max_by_key(|(n, _, _)| *n);
        let Some((number, control, _)) = last else {
            debug!(target: "cascade.page", "no numbered pagination controls");
            return Ok(false);
        };
        self.click_control(&control, &format!("page {number}")).await?;
        debug!(target: "cascade.page", page = number, "moved to last page");
        Ok(true)
    }

    async fn goto_next_page(&self) -> Result<bool> {
        if let Some(next) = self.enabled_next_button().await? {
            self.click_control(&next, "next page").await?;
            debug!(target: "cascade.page", "moved to next page");
            return Ok(true);
        }

        let controls = self.numbered_controls().await?;
        let current = controls.iter().find(|(_, _, active)| *active).map(|(n, _, _)| *n);
        let numbers: Vec<u32> = controls.iter().map(|(n, _, _)| *n).collect();
        let Some(target) = next_page_number(current, &numbers) else {
            debug!(target: "cascade.page", ?current, "no further page");
            return Ok(false);
        };
        if let Some((_, control, _)) = controls.into_iter().find(|(n, _, _)| *n == target) {
            self.click_control(&control, &format!("page {target}")).await?;
        }
        debug!(target: "cascade.page", page = target, "moved to next numbered page");
        Ok(true)
    }
}

impl WebDriverPage {
    /// Displayed pagination controls with a numeric label, flagged when the
    /// control marks the current page.
    async fn numbered_controls(&self) -> Result<Vec<(u32, Element, bool)>> {
        let controls = self
            .client
            .find_all(Locator::Css(&self.layout.table.pagination_selector))
            .await
            .context("listing pagination controls")?;

        let mut numbered = Vec::with_capacity(controls.len());
        for control in controls {
            if !control.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let text = control.text().await.context("reading pagination label")?;
            let Ok(number) = text.trim().parse::<u32>() else {
                continue;
            };
            let active = control.attr("data-active").await.ok().flatten().is_some()
                || control.attr("aria-current").await.ok().flatten().as_deref() == Some("page");
            numbered.push((number, control, active));
        }
        Ok(numbered)
    }

    async fn enabled_next_button(&self) -> Result<Option<Element>> {
        let buttons = self
            .client
            .find_all(Locator::XPath(&self.layout.table.next_xpath))
            .await
            .context("looking for next button")?;
        for button in buttons {
            if !button.is_displayed().await.unwrap_or(false) {
                continue;
            }
            let disabled = button.attr("disabled").await.ok().flatten().is_some()
                || button.attr("data-disabled").await.ok().flatten().is_some();
            if !disabled {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }

    /// Scroll `control` into view and click it, falling back to a script
    /// click when an overlay intercepts the native one.
    async fn click_control(&self, control: &Element, what: &str) -> Result<()> {
        let handle = serde_json::to_value(control).context("serialising element handle")?;
        if let Err(e) = self
            .client
            .execute("arguments[0].scrollIntoView({block: 'center'});", vec![handle.clone()])
            .await
        {
            debug!(target: "cascade.page", error = %e, %what, "scroll into view failed");
        }
        if let Err(e) = control.click().await {
            warn!(target: "cascade.page", error = %e, %what, "click intercepted; using script click");
            self.client
                .execute("arguments[0].click();", vec![handle])
                .await
                .with_context(|| format!("clicking {what}"))?;
        }
        Ok(())
    }
}

/// Ctrl+A, release, Delete.
fn select_all_and_delete() -> String {
    let mut keys = String::new();
    keys.push(char::from(Key::Control));
    keys.push('a');
    keys.push(char::from(Key::Null));
    keys.push(char::from(Key::Delete));
    keys
}

/// Smallest page number after `current`; page 1 when nothing is marked
/// current.
fn next_page_number(current: Option<u32>, numbers: &[u32]) -> Option<u32> {
    let current = current.unwrap_or(1);
    numbers.iter().copied().filter(|n| *n > current).min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_keys_select_all_then_delete() {
        let keys: Vec<char> = select_all_and_delete().chars().collect();
        assert_eq!(
            keys,
            vec![
                char::from(Key::Control),
                'a',
                char::from(Key::Null),
                char::from(Key::Delete),
            ]
        );
    }

    #[test]
    fn next_page_follows_current() {
        assert_eq!(next_page_number(Some(2), &[1, 2, 3, 10]), Some(3));
        assert_eq!(next_page_number(Some(10), &[1, 2, 3, 10]), None);
    }

    #[test]
    fn next_page_assumes_first_when_unmarked() {
        assert_eq!(next_page_number(None, &[3, 1, 2]), Some(2));
        assert_eq!(next_page_number(None, &[1]), None);
        assert_eq!(next_page_number(None, &[]), None);
    }
}
