//! User interface module - terminal output.
//!
//! - `formatter` - headers, findings and release plans

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_header, display_release_plan, display_status, display_success,
    display_summary, display_warning,
};
