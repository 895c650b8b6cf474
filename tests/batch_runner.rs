mod common;

use common::{gateway_down, ScriptedGateway};
use license_triage::{BatchRunner, Config, FilePipeline};
use std::sync::Arc;

fn runner(gateway: ScriptedGateway, config: &Config) -> BatchRunner {
    let pipeline = Arc::new(FilePipeline::new(Arc::new(gateway), &config.analysis));
    BatchRunner::new(pipeline, config)
}

#[tokio::test]
async fn batch_degrades_per_file_but_writes_every_analysis() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("first.py"), "def f(): pass\n").unwrap();
    std::fs::write(input.path().join("second.py"), "def g(): pass\n").unwrap();
    std::fs::write(input.path().join("notes.txt"), "not source\n").unwrap();

    let mut config = Config::default();
    config.file_extensions = vec!["py".to_string()];
    let gateway = ScriptedGateway::new(|_task, _prompt| Err(gateway_down()));

    let report = runner(gateway, &config)
        .run(input.path(), output.path())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failed_count(), 0);
    assert!(output.path().join("first_analysis.json").exists());
    assert!(output.path().join("second_analysis.json").exists());
    assert!(!output.path().join("notes_analysis.json").exists());
}

#[tokio::test]
async fn writer_failure_is_isolated_per_file() {
    let input = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("first.py"), "def f(): pass\n").unwrap();
    std::fs::write(input.path().join("second.py"), "def g(): pass\n").unwrap();

    // A regular file in place of the output directory makes every write fail.
    let scratch = tempfile::tempdir().unwrap();
    let output = scratch.path().join("output");
    std::fs::write(&output, "occupied").unwrap();

    let mut config = Config::default();
    config.file_extensions = vec!["py".to_string()];
    let gateway = ScriptedGateway::new(|_task, _prompt| Err(gateway_down()));

    let report = runner(gateway, &config)
        .run(input.path(), &output)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 0);
    assert_eq!(report.failed_count(), 2);
    let mut failed: Vec<&str> = report
        .failures
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    failed.sort();
    assert_eq!(failed, ["first.py", "second.py"]);
}

#[tokio::test]
async fn empty_input_directory_yields_empty_report() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let config = Config::default();
    let gateway = ScriptedGateway::new(|_task, _prompt| Err(gateway_down()));

    let report = runner(gateway, &config)
        .run(input.path(), output.path())
        .await
        .unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(report.failed_count(), 0);
}
