pub mod chrome;
pub mod driver;
pub mod page;
pub mod pacing;
