pub mod orchestration;

pub use orchestration::{run_new_release, run_validation, NewReleaseArgs, ValidateArgs};
