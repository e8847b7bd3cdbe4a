use crate::gate::{await_idle, GateConfig};
use cascade_common::Result;
use cascade_drivers::{PageDriver, Record, RecordSource};
use std::collections::HashSet;
use tracing::info;

/// Which result pages to read after applying a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSpan {
    /// The first page and the highest numbered one.
    #[default]
    FirstAndLast,
    /// Every page, following "next" until nothing new appears.
    All,
}

/// Read the result table according to `span`.
pub async fn gather<P>(page: &P, span: PageSpan, gate: &GateConfig) -> Result<Vec<Record>>
where
    P: PageDriver + RecordSource,
{
    match span {
        PageSpan::FirstAndLast => gather_first_and_last(page, gate).await,
        PageSpan::All => gather_all_pages(page, gate).await,
    }
}

/// Read the first result page and the last numbered page.
///
/// Rows from the last page that already appeared on the first are dropped,
/// which also covers single-page results where both reads see the same rows.
pub async fn gather_first_and_last<P>(page: &P, gate: &GateConfig) -> Result<Vec<Record>>
where
    P: PageDriver + RecordSource,
{
    await_idle(page, gate).await?;
    let mut records = page.read_records().await?;
    info!(target: "cascade.gather", count = records.len(), "read first page");

    if !page.goto_last_page().await? {
        return Ok(records);
    }
    await_idle(page, gate).await?;

    let last = page.read_records().await?;
    info!(target: "cascade.gather", count = last.len(), "read last page");

    let mut seen: HashSet<Record> = records.iter().cloned().collect();
    for record in last {
        if seen.insert(record.clone()) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read every result page.
///
/// Advances with [`RecordSource::goto_next_page`] and stops when there is no
/// next page or a page contributes no unseen rows, which catches pagers that
/// keep re-rendering the final page.
pub async fn gather_all_pages<P>(page: &P, gate: &GateConfig) -> Result<Vec<Record>>
where
    P: PageDriver + RecordSource,
{
    await_idle(page, gate).await?;
    let mut records = page.read_records().await?;
    let mut seen: HashSet<Record> = records.iter().cloned().collect();
    let mut pages = 1;

    while page.goto_next_page().await? {
        await_idle(page, gate).await?;
        let before = records.len();
        for record in page.read_records().await? {
            if seen.insert(record.clone()) {
                records.push(record);
            }
        }
        if records.len() == before {
            info!(target: "cascade.gather", page = pages + 1, "page added no new rows; stopping");
            break;
        }
        pages += 1;
    }

    info!(target: "cascade.gather", pages, count = records.len(), "read all pages");
    Ok(records)
}
