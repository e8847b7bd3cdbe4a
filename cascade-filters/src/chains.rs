use crate::collect::{collect, CollectedOptions, Selections};
use crate::gate::{await_idle, GateConfig};
use cascade_common::Result;
use cascade_drivers::PageDriver;
use tracing::{info, warn};

/// A complete path through every level, e.g. region → area → point.
pub type FilterChain = Selections;

/// One level of the hierarchy to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    pub id: String,
    /// Explore at most this many options at the level; `None` explores all.
    pub limit: Option<usize>,
}

impl LevelPlan {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            limit: None,
        }
    }

    pub fn limited(id: impl Into<String>, limit: usize) -> Self {
        Self {
            id: id.into(),
            limit: Some(limit),
        }
    }
}

/// Clear every level, deepest first, then wait for the page to settle.
pub async fn reset_filters<L: AsRef<str>>(
    driver: &dyn PageDriver,
    levels: &[L],
    gate: &GateConfig,
) -> Result<()> {
    for level in levels.iter().rev() {
        driver.clear_selection(level.as_ref()).await?;
    }
    await_idle(driver, gate).await
}

/// Enumerate every complete chain reachable through `plan`.
///
/// Depth-first in render order. Each prefix is re-applied from a cleared
/// page before the next level is read, so one level's options never leak
/// into a sibling's. A prefix whose option disappeared on re-application is
/// skipped; timeouts and driver errors abort the enumeration.
pub async fn enumerate_chains(
    driver: &dyn PageDriver,
    plan: &[LevelPlan],
    gate: &GateConfig,
) -> Result<Vec<FilterChain>> {
    let mut chains = Vec::new();
    if plan.is_empty() {
        return Ok(chains);
    }
    let ids: Vec<&str> = plan.iter().map(|l| l.id.as_str()).collect();

    let mut pending = vec![Selections::new()];
    while let Some(prefix) = pending.pop() {
        let depth = prefix.len();
        let level = &plan[depth];

        reset_filters(driver, &ids, gate).await?;
        let mut options = match collect(driver, &ids[..=depth], &prefix, gate).await {
            Ok(collected) => collected
                .get(&level.id)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            Err(e) if e.is_selection_not_found() => {
                warn!(target: "cascade.chains", %prefix, error = %e, "prefix no longer applies; skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        if let Some(limit) = level.limit {
            options.truncate(limit);
        }
        info!(
            target: "cascade.chains",
            level = %level.id,
            %prefix,
            count = options.len(),
            "level options"
        );

        if depth + 1 == plan.len() {
            chains.extend(
                options
                    .into_iter()
                    .map(|label| prefix.clone().with(level.id.as_str(), label)),
            );
        } else {
            // Reversed so the stack pops siblings in render order.
            pending.extend(
                options
                    .into_iter()
                    .rev()
                    .map(|label| prefix.clone().with(level.id.as_str(), label)),
            );
        }
    }

    info!(target: "cascade.chains", count = chains.len(), "built filter chains");
    Ok(chains)
}

/// Clear the page and select every level of `chain` in order, waiting for
/// the gate after each selection.
pub async fn apply_chain(
    driver: &dyn PageDriver,
    chain: &FilterChain,
    gate: &GateConfig,
) -> Result<CollectedOptions> {
    let levels: Vec<&str> = chain.levels().collect();
    reset_filters(driver, &levels, gate).await?;
    collect(driver, &levels, chain, gate).await
}
