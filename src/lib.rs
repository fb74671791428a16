pub mod ci;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod governance;
pub mod increment;
pub mod ui;
pub mod validate;

pub use error::{ReleaseError, Result};
