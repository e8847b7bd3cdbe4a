//! Loading waits and dependent-dropdown filtering over a [`PageDriver`].
//!
//! Everything here is a stateless async function taking the driver
//! explicitly, so the same code runs against a WebDriver session or a
//! scripted fake.
//!
//! - [`gate`]: poll until loading indicators are hidden
//! - [`collect`]: read options level by level, applying selections
//! - [`chains`]: enumerate and apply complete filter chains
//! - [`gather`]: read the first and last result pages, or all of them
//! - [`verify`]: check result rows against an applied chain
//! - [`run`]: apply, gather and verify many chains and summarise
//!
//! [`PageDriver`]: cascade_drivers::PageDriver

pub mod chains;
pub mod collect;
pub mod gate;
pub mod gather;
pub mod run;
pub mod verify;

pub use chains::{apply_chain, enumerate_chains, reset_filters, FilterChain, LevelPlan};
pub use collect::{collect, CollectedOptions, DropdownLevel, Selections};
pub use gate::{await_idle, GateConfig};
pub use gather::{gather, gather_all_pages, gather_first_and_last, PageSpan};
pub use run::{exercise_chain, run_chains, ChainOutcome, RunReport, RunSummary};
pub use verify::{verify_records, InvalidRecord, LevelCompliance, VerificationReport};
