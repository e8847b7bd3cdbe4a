//! Wiring from `CascadeConfig` to a live browser page.

use anyhow::{Context, Result, bail};
use cascade_config::{CascadeConfig, DropdownSettings, GateSettings, SetupStep};
use cascade_drivers::cascade_browser::{
    chrome::ChromeOptions,
    driver::CascadeDriver,
    pacing::Pacing,
    page::{PageLayout, TableLayout, WebDriverPage},
};
use cascade_filters::{GateConfig, LevelPlan, PageSpan, Selections, await_idle};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct Session {
    driver: CascadeDriver,
    pub page: WebDriverPage,
    pub gate: GateConfig,
    pub plan: Vec<LevelPlan>,
    pub pages: PageSpan,
}

impl Session {
    /// Connect to WebDriver, open `start_url` and run the setup steps.
    pub async fn open(cfg: &CascadeConfig) -> Result<Self> {
        let Some(start_url) = cfg.start_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            bail!("start_url must be configured");
        };

        let options = ChromeOptions {
            headless: cfg.webdriver.headless,
            ..ChromeOptions::default()
        };
        let driver = CascadeDriver::connect(&cfg.webdriver.url, &options).await?;
        let gate = gate_config(&cfg.gate);

        let page = match driver
            .open(start_url, page_layout(cfg), pacing(&cfg.dropdown))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                if let Err(close) = driver.close().await {
                    error!(target: "cascade.session", error = %close, "failed to close WebDriver session");
                }
                return Err(e);
            }
        };
        let session = Self {
            driver,
            page,
            gate,
            plan: level_plan(cfg),
            pages: page_span(cfg.table.pages),
        };

        if let Err(e) = run_setup(&session.page, &cfg.setup, &session.gate).await {
            if let Err(close) = session.close().await {
                error!(target: "cascade.session", error = %close, "failed to close WebDriver session");
            }
            return Err(e);
        }
        info!(target: "cascade.session", url = %start_url, steps = cfg.setup.len(), "session ready");
        Ok(session)
    }

    pub fn level_ids(&self) -> Vec<&str> {
        self.plan.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn selections(&self, pairs: &[(String, String)]) -> Result<Selections> {
        selections_for(&self.plan, pairs)
    }

    pub async fn close(self) -> Result<()> {
        self.driver.close().await
    }
}

async fn run_setup(page: &WebDriverPage, steps: &[SetupStep], gate: &GateConfig) -> Result<()> {
    for (i, step) in steps.iter().enumerate() {
        debug!(target: "cascade.session", step = i + 1, ?step, "setup step");
        let outcome = match step {
            SetupStep::Click { selector } => page.click(selector).await,
            SetupStep::Fill { selector, value } => page.fill(selector, value).await,
            SetupStep::WaitIdle => await_idle(page, gate).await,
            SetupStep::Pause { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
        };
        outcome.with_context(|| format!("setup step {} failed", i + 1))?;
    }
    Ok(())
}

/// Build selections from `level=label` pairs, rejecting unknown levels.
pub fn selections_for(plan: &[LevelPlan], pairs: &[(String, String)]) -> Result<Selections> {
    let mut selections = Selections::new();
    for (level, label) in pairs {
        if !plan.iter().any(|l| &l.id == level) {
            let known: Vec<&str> = plan.iter().map(|l| l.id.as_str()).collect();
            bail!("unknown level '{level}'; configured levels: {}", known.join(", "));
        }
        selections.insert(level.as_str(), label.as_str());
    }
    Ok(selections)
}

pub fn page_span(pages: cascade_config::PageSpan) -> PageSpan {
    match pages {
        cascade_config::PageSpan::FirstLast => PageSpan::FirstAndLast,
        cascade_config::PageSpan::All => PageSpan::All,
    }
}

pub fn gate_config(settings: &GateSettings) -> GateConfig {
    GateConfig::new(settings.indicators.iter().cloned())
        .with_timeout(settings.timeout())
        .with_poll_interval(settings.poll_interval())
        .with_settle(settings.settle())
}

pub fn pacing(settings: &DropdownSettings) -> Pacing {
    Pacing {
        after_open: Duration::from_millis(settings.open_delay_ms),
        after_select: Duration::from_millis(settings.select_delay_ms),
        after_close: Duration::from_millis(settings.close_delay_ms),
    }
}

pub fn page_layout(cfg: &CascadeConfig) -> PageLayout {
    PageLayout {
        levels: cfg
            .levels
            .iter()
            .map(|l| (l.id.clone(), l.selector.clone()))
            .collect(),
        option_selector: cfg.dropdown.option_selector.clone(),
        open_timeout: Duration::from_millis(cfg.dropdown.open_timeout_ms),
        table: TableLayout {
            row_selector: cfg.table.row_selector.clone(),
            cell_selector: cfg.table.cell_selector.clone(),
            columns: cfg.table_columns(),
            pagination_selector: cfg.table.pagination_selector.clone(),
            next_xpath: cfg.table.next_xpath.clone(),
        },
    }
}

pub fn level_plan(cfg: &CascadeConfig) -> Vec<LevelPlan> {
    cfg.levels
        .iter()
        .map(|l| LevelPlan {
            id: l.id.clone(),
            limit: l.limit,
        })
        .collect()
}
