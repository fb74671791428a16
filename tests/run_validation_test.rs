// tests/run_validation_test.rs
use std::fs;

use release_guard::cli::{run_validation, ValidateArgs};
use release_guard::config::Config;
use tempfile::TempDir;

#[test]
fn test_broken_file_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let series_dir = dir.path().join("2024.1");
    fs::create_dir_all(&series_dir).unwrap();
    let good = series_dir.join("good.yaml");
    let broken = series_dir.join("broken.yaml");
    fs::write(&good, "team: demo\nrelease-model: cycle-with-rc\n").unwrap();
    fs::write(&broken, "releases: [: :").unwrap();

    let mut config = Config::default();
    config.release.deliverables_dir = dir.path().to_path_buf();
    config.git.base_url = dir.path().join("no-remote").display().to_string();

    let args = ValidateArgs {
        inputs: vec![broken.clone(), good.clone()],
        ..Default::default()
    };
    let report = run_validation(args, &config).unwrap();

    let broken_name = broken.display().to_string();
    let good_name = good.display().to_string();
    assert_eq!(report.errors.len(), 1, "unexpected errors: {:?}", report.errors);
    assert_eq!(report.errors[0].filename, broken_name);
    assert_eq!(report.errors[0].rule, "read-file");
    assert!(report.errors[0].message.starts_with("could not read deliverable"));

    // the good file was still checked after the broken one
    assert!(report.warnings.iter().any(|f| f.filename == good_name));
    assert_eq!(report.exit_code(), 1);
}
