//! End-to-end tests: raw event logs on disk through all three stages.

use orchestrator::{
    Dataset, OrchestratorError, PipelineConfig, PipelineOrchestrator, Stage,
};
use scoring::InvalidEventPolicy;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn line(event_type: &str, actor: &str, owner: &str, name: &str, at: &str) -> String {
    format!(
        r#"{{"type":"{}","actor":"{}","created_at":"{}","repository":{{"owner":"{}","name":"{}","language":"Ruby","description":"A repo","watchers":10,"forks":2}},"actor_attributes":{{"gravatar_id":"g-{}"}}}}"#,
        event_type, actor, at, owner, name, actor
    )
}

fn write_logs(root: &Path, extra: &[String]) {
    let day1 = root.join("raw_events/2012/03/11");
    let day2 = root.join("raw_events/2012/03/12");
    fs::create_dir_all(&day1).unwrap();
    fs::create_dir_all(&day2).unwrap();

    let mut first = vec![
        line("PushEvent", "alice", "rails", "rails", "2012-03-11T06:00:00-07:00"),
        line("PushEvent", "alice", "rack", "rack", "2012-03-11T07:00:00-07:00"),
        line("WatchEvent", "bob", "rails", "rails", "2012-03-11T08:00:00-07:00"),
        line("PushEvent", "bob", "rack", "rack", "2012-03-11T09:00:00-07:00"),
        String::new(),
    ];
    first.extend_from_slice(extra);
    fs::write(day1.join("0.json"), first.join("\n")).unwrap();

    let second = [
        line("ForkEvent", "carol", "rails", "rails", "2012-03-12T06:00:00-07:00"),
        line("PullRequestEvent", "carol", "sinatra", "sinatra", "2012-03-12T07:00:00-07:00"),
        line("PushEvent", "bob", "sinatra", "sinatra", "2012-03-12T08:00:00-07:00"),
        line("WatchEvent", "dave", "rails", "rails", "2012-03-12T09:00:00-07:00"),
    ];
    fs::write(day2.join("0.json"), second.join("\n")).unwrap();
}

fn create_orchestrator(root: &Path) -> PipelineOrchestrator {
    let config = PipelineConfig::builder()
        .root(root)
        .events("raw_events/*/*/*/*.json")
        .parallelism(2)
        .build()
        .unwrap();
    PipelineOrchestrator::new(config).unwrap()
}

fn read_lines(root: &Path, name: &str) -> Vec<String> {
    fs::read_to_string(root.join(name))
        .unwrap()
        .lines()
        .map(|l| l.to_string())
        .collect()
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    write_logs(dir.path(), &[]);
    let orchestrator = create_orchestrator(dir.path());

    let report = orchestrator.run().await.unwrap();
    let stages: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
    assert_eq!(stages, Stage::ALL.to_vec());

    assert_eq!(read_lines(dir.path(), "user_ids"), vec!["alice", "bob", "carol", "dave"]);
    assert_eq!(
        read_lines(dir.path(), "item_ids"),
        vec!["rack/rack", "rails/rails", "sinatra/sinatra"]
    );
    assert_eq!(read_lines(dir.path(), "user_gravatar_ids").len(), 4);
    assert_eq!(read_lines(dir.path(), "user_item_affinities").len(), 8);
    assert_eq!(read_lines(dir.path(), "item_metadata").len(), 3);

    for dataset in Stage::ALL.iter().flat_map(|s| s.outputs()) {
        assert!(orchestrator.config().dataset_path(*dataset).is_file(), "{} missing", dataset);
    }

    // dave only watched rails, so his specific list is empty but still listed
    let specific = orchestrator
        .read_recommendations(Dataset::UserSpecificRecs)
        .unwrap();
    assert_eq!(specific.len(), 4);
    let dave = specific.iter().find(|r| r.subject_id == "dave").unwrap();
    assert!(dave.is_empty());

    // but the cold-start prior gives him a general list without rails
    let general = orchestrator
        .read_recommendations(Dataset::UserGeneralRecs)
        .unwrap();
    let dave = general.iter().find(|r| r.subject_id == "dave").unwrap();
    assert!(!dave.items.is_empty());
    assert!(dave.items.iter().all(|s| s.item_id != "rails/rails"));

    // no leftover partial files
    let hidden = fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(hidden, 0);
}

#[tokio::test]
async fn test_in_memory_user_recs_cover_every_user() {
    let dir = TempDir::new().unwrap();
    write_logs(dir.path(), &[]);
    let orchestrator = create_orchestrator(dir.path());
    orchestrator.run_stage(Stage::ExtractEvents).await.unwrap();
    orchestrator.run_stage(Stage::GenItemRecs).await.unwrap();

    let recs = orchestrator.compute_user_recs().await.unwrap();
    let subjects: Vec<&str> = recs.specific.iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(subjects, vec!["alice", "bob", "carol", "dave"]);
    assert_eq!(recs.general.len(), 4);

    let dave = recs.specific.iter().find(|r| r.subject_id == "dave").unwrap();
    assert!(dave.is_empty());
}

#[tokio::test]
async fn test_stage_without_inputs_fails_early() {
    let dir = TempDir::new().unwrap();
    let orchestrator = create_orchestrator(dir.path());

    let err = orchestrator.run_stage(Stage::GenUserRecs).await.unwrap_err();
    match err {
        OrchestratorError::MissingInput { stage, dataset, .. } => {
            assert_eq!(stage, Stage::GenUserRecs);
            assert_eq!(dataset, Dataset::UserIds);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!orchestrator.config().dataset_path(Dataset::UserSpecificRecs).exists());
}

#[tokio::test]
async fn test_invalid_event_halts_pipeline() {
    let dir = TempDir::new().unwrap();
    write_logs(
        dir.path(),
        &[line("BogusEvent", "erin", "rails", "rails", "2012-03-11T10:00:00-07:00")],
    );
    let orchestrator = create_orchestrator(dir.path());

    let err = orchestrator.run().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ExtractEvents));
    assert!(matches!(err, OrchestratorError::StageFailure { .. }));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("BogusEvent"));

    // later stages never ran
    assert!(!orchestrator.config().dataset_path(Dataset::UserIds).exists());
    assert!(!orchestrator.config().dataset_path(Dataset::ItemRecs).exists());
}

#[tokio::test]
async fn test_invalid_events_can_be_skipped() {
    let dir = TempDir::new().unwrap();
    write_logs(
        dir.path(),
        &[line("BogusEvent", "erin", "rails", "rails", "2012-03-11T10:00:00-07:00")],
    );
    let config = PipelineConfig::builder()
        .root(dir.path())
        .events("raw_events/*/*/*/*.json")
        .parallelism(1)
        .invalid_event_policy(InvalidEventPolicy::SkipAndLog)
        .build()
        .unwrap();
    let orchestrator = PipelineOrchestrator::new(config).unwrap();

    let report = orchestrator.run_stage(Stage::ExtractEvents).await.unwrap();
    assert!(report.rows.contains(&(Dataset::UserIds, 4)));
    assert!(!read_lines(dir.path(), "user_ids").contains(&"erin".to_string()));
}

#[tokio::test]
async fn test_missing_event_logs_fail_the_stage() {
    let dir = TempDir::new().unwrap();
    let orchestrator = create_orchestrator(dir.path());

    let err = orchestrator.run_stage(Stage::ExtractEvents).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::StageFailure { stage: Stage::ExtractEvents, .. }
    ));
}

#[tokio::test]
async fn test_failed_stage_commits_none_of_its_outputs() {
    let dir = TempDir::new().unwrap();
    write_logs(dir.path(), &[]);
    let orchestrator = create_orchestrator(dir.path());

    // The last output of extract_events cannot be replaced
    let metadata = orchestrator.config().dataset_path(Dataset::ItemMetadata);
    fs::create_dir_all(metadata.join("occupied")).unwrap();

    let err = orchestrator.run_stage(Stage::ExtractEvents).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::StageFailure { stage: Stage::ExtractEvents, .. }
    ));

    for dataset in Stage::ExtractEvents.outputs() {
        let path = orchestrator.config().dataset_path(*dataset);
        assert!(!path.is_file(), "{} was committed", dataset);
    }
    let hidden = fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(hidden, 0);
}
