// tests/new_release_test.rs
use std::fs;
use std::path::Path;

use release_guard::cli::orchestration::{deliverable_path, write_release};
use release_guard::domain::{Deliverable, DeliverableIndex};
use release_guard::git::MockGit;
use release_guard::increment::{ReleasePlanner, ReleaseType};
use tempfile::TempDir;

const SHA_1: &str = "1111111111111111111111111111111111111111";
const SHA_2: &str = "2222222222222222222222222222222222222222";

fn write_deliverable(root: &Path, series: &str, version: &str) {
    let path = deliverable_path(root, series, "demo");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        format!(
            "team: demo\ntype: library\nrelease-model: cycle-with-intermediary\n\
             repository-settings:\n  openstack/demo: {{}}\nreleases:\n  - version: {}\n    \
             projects:\n      - repo: openstack/demo\n        hash: {}\n",
            version, SHA_1
        ),
    )
    .unwrap();
}

#[test]
fn test_index_loads_every_series() {
    let dir = TempDir::new().unwrap();
    write_deliverable(dir.path(), "2023.2", "2.4.0");
    write_deliverable(dir.path(), "2024.1", "2.5.0");
    write_deliverable(dir.path(), "independent", "1.0.0");

    let index = DeliverableIndex::load(dir.path()).unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.series_names(), vec!["2023.2", "2024.1", "independent"]);

    let history: Vec<&str> = index.history("demo").iter().map(|d| d.series()).collect();
    assert_eq!(history, vec!["2023.2", "2024.1", "independent"]);
}

#[test]
fn test_feature_release_is_written_to_the_file() {
    let dir = TempDir::new().unwrap();
    write_deliverable(dir.path(), "2023.2", "2.4.0");
    write_deliverable(dir.path(), "2024.1", "2.5.0");
    let index = DeliverableIndex::load(dir.path()).unwrap();

    let mut git = MockGit::new();
    git.add_branch("openstack/demo", "master", &[SHA_1, SHA_2]);
    let plan = ReleasePlanner::new(&git)
        .plan(&index.history("demo"), "2024.1", ReleaseType::Feature)
        .unwrap();
    assert_eq!(plan.version, "2.6.0");
    assert!(plan.has_changes);

    let path = deliverable_path(dir.path(), "2024.1", "demo");
    write_release(&path, &plan).unwrap();

    let updated = Deliverable::read_file(&path).unwrap();
    let versions: Vec<&str> = updated.releases().iter().map(|r| r.version.as_str()).collect();
    assert_eq!(versions, vec!["2.5.0", "2.6.0"]);
    assert_eq!(updated.releases()[1].projects[0].hash, SHA_2);
    assert_eq!(updated.team(), Some("demo"));
    assert_eq!(updated.declared_model(), Some("cycle-with-intermediary"));

    // the older series is untouched
    let older = Deliverable::read_file(&deliverable_path(dir.path(), "2023.2", "demo")).unwrap();
    assert_eq!(older.releases().len(), 1);
}

#[test]
fn test_write_release_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    write_deliverable(dir.path(), "2024.1", "2.5.0");
    let index = DeliverableIndex::load(dir.path()).unwrap();

    let mut git = MockGit::new();
    git.add_branch("openstack/demo", "master", &[SHA_1, SHA_2]);
    let plan = ReleasePlanner::new(&git)
        .plan(&index.history("demo"), "2024.1", ReleaseType::Bugfix)
        .unwrap();

    let missing = deliverable_path(dir.path(), "2024.2", "demo");
    let err = write_release(&missing, &plan).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}
