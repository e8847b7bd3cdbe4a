use crate::chains::{apply_chain, FilterChain};
use crate::gate::GateConfig;
use crate::gather::{gather, PageSpan};
use crate::verify::{percentage, verify_records, VerificationReport};
use cascade_common::Result;
use cascade_drivers::{PageDriver, RecordSource};
use serde::Serialize;
use tracing::{info, warn};

/// Result of exercising one chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainOutcome {
    pub chain: FilterChain,
    pub record_count: usize,
    pub verification: VerificationReport,
}

impl ChainOutcome {
    pub fn passed(&self) -> bool {
        self.verification.is_clean()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Chains that could not be applied and were not verified.
    pub skipped: usize,
    pub success_rate: f64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ChainOutcome], skipped: usize) -> Self {
        let total = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed()).count();
        Self {
            total,
            passed,
            failed: total - passed,
            skipped,
            success_rate: percentage(passed, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<ChainOutcome>,
    pub skipped: Vec<FilterChain>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &ChainOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

/// Apply `chain`, read the result pages `span` selects and verify them.
pub async fn exercise_chain<P>(
    page: &P,
    chain: &FilterChain,
    span: PageSpan,
    gate: &GateConfig,
) -> Result<ChainOutcome>
where
    P: PageDriver + RecordSource,
{
    apply_chain(page, chain, gate).await?;
    let records = gather(page, span, gate).await?;
    let verification = verify_records(&records, chain);

    info!(
        target: "cascade.run",
        %chain,
        records = records.len(),
        valid = verification.valid_records,
        invalid = verification.invalid_records.len(),
        "verified chain"
    );
    Ok(ChainOutcome {
        chain: chain.clone(),
        record_count: records.len(),
        verification,
    })
}

/// Exercise every chain in order.
///
/// A chain whose option is no longer offered is skipped; timeouts and
/// driver errors stop the run.
pub async fn run_chains<P>(
    page: &P,
    chains: &[FilterChain],
    span: PageSpan,
    gate: &GateConfig,
) -> Result<RunReport>
where
    P: PageDriver + RecordSource,
{
    let mut outcomes = Vec::with_capacity(chains.len());
    let mut skipped = Vec::new();

    for (i, chain) in chains.iter().enumerate() {
        info!(target: "cascade.run", test = i + 1, of = chains.len(), %chain, "exercising chain");
        match exercise_chain(page, chain, span, gate).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) if e.is_selection_not_found() => {
                warn!(target: "cascade.run", %chain, error = %e, "could not apply chain");
                skipped.push(chain.clone());
            }
            Err(e) => return Err(e),
        }
    }

    let summary = RunSummary::from_outcomes(&outcomes, skipped.len());
    info!(
        target: "cascade.run",
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        success_rate = summary.success_rate,
        "run complete"
    );
    Ok(RunReport {
        outcomes,
        skipped,
        summary,
    })
}
