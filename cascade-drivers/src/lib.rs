//! Driver layer for the Cascade filter exerciser.
//!
//! - [`capability::PageDriver`]: dropdown/indicator access the filter logic needs
//! - [`capability::RecordSource`]: paginated result-table access
//! - [`cascade_browser::driver::CascadeDriver`]: `fantoccini` WebDriver session
//! - [`cascade_browser::page::WebDriverPage`]: CSS-selector backed implementation of both capabilities
pub mod capability;
pub mod cascade_browser;

pub use capability::{PageDriver, Record, RecordSource};
