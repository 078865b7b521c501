//! Integration tests for the vitafit binary.
//!
//! These tests verify end-to-end behavior including:
//! - Writing demo models and predicting from them
//! - Structured errors for bad input and missing models
//! - Batch CSV runs

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("vitafit").expect("Failed to find vitafit binary");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("VITAFIT_MODELS_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn write_demo_models(home: &Path) -> std::path::PathBuf {
    let models_dir = home.join("models");
    cli(home)
        .arg("demo-models")
        .arg("--out")
        .arg(&models_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote demo models"));
    models_dir
}

fn predict_args(cmd: &mut Command, gender: &str) {
    cmd.arg("predict")
        .args(["--age", "30", "--gender", gender])
        .args(["--height", "180", "--height-unit", "cm"])
        .args(["--weight", "80", "--weight-unit", "kg"])
        .args(["--calories", "2200"]);
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Exercise and diet plan predictions",
        ));
}

#[test]
fn test_demo_models_writes_artifacts() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    for name in [
        "multi_classifier.json",
        "multi_regressor.json",
        "label_encoders.json",
        "diet_model.json",
        "diet_label_encoders.json",
    ] {
        assert!(models_dir.join(name).exists(), "missing {}", name);
    }
}

#[test]
fn test_predict_human_output() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    let mut cmd = cli(temp_dir.path());
    cmd.arg("--models-dir").arg(&models_dir);
    predict_args(&mut cmd, "Male");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("FITNESS PLAN"))
        .stdout(predicate::str::contains("BMI: 24.69"))
        .stdout(predicate::str::contains("Strength"));
}

#[test]
fn test_predict_json_output() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    let mut cmd = cli(temp_dir.path());
    cmd.arg("--models-dir").arg(&models_dir).arg("--json");
    predict_args(&mut cmd, "male");

    let output = cmd.assert().success().get_output().stdout.clone();
    let record: Value = serde_json::from_slice(&output).expect("valid JSON record");

    assert_eq!(record["processed_features"]["bmi"], 24.69);
    assert_eq!(record["processed_features"]["gender_code"], 1);
    assert_eq!(record["exercise_plan"]["exercise_type"], "Strength");
    assert_eq!(record["exercise_plan"]["frequency_per_week"], 4);
    assert_eq!(record["exercise_plan"]["duration_minutes"], 45);
    assert_eq!(record["exercise_plan"]["estimated_calorie_burn"], 413);
    assert_eq!(record["diet_plan"]["status"], "available");
    assert!(record["session_id"].is_string());
}

#[test]
fn test_predict_invalid_gender() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    let mut cmd = cli(temp_dir.path());
    cmd.arg("--models-dir").arg(&models_dir).arg("--json");
    predict_args(&mut cmd, "unknown");

    let output = cmd.assert().code(2).get_output().stderr.clone();
    let stderr = String::from_utf8(output).unwrap();
    let last_line = stderr.lines().filter(|l| !l.trim().is_empty()).last().unwrap();
    let report: Value = serde_json::from_str(last_line).expect("JSON error report");
    assert_eq!(report["kind"], "invalid_category");
    assert!(report["message"].as_str().unwrap().contains("unknown"));
}

#[test]
fn test_predict_without_models_fails() {
    let temp_dir = setup_test_dir();

    let mut cmd = cli(temp_dir.path());
    cmd.arg("--models-dir").arg(temp_dir.path().join("missing"));
    predict_args(&mut cmd, "Male");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("model_load"));
}

#[test]
fn test_models_dir_from_env() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    let mut cmd = cli(temp_dir.path());
    cmd.env("VITAFIT_MODELS_DIR", &models_dir);
    predict_args(&mut cmd, "Female");

    cmd.assert().success().stdout(predicate::str::contains("FITNESS PLAN"));
}

#[test]
fn test_bmi_command() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["bmi", "--height", "180", "--weight", "80"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI:    24.69"));
}

#[test]
fn test_bmi_unrecognized_unit_is_blank() {
    let temp_dir = setup_test_dir();

    let output = cli(temp_dir.path())
        .args(["--json", "bmi", "--height", "70", "--height-unit", "furlongs"])
        .args(["--weight", "80"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["height_cm"], 0.0);
    assert!(value["bmi"].is_null());
}

#[test]
fn test_batch_command() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());
    let input = temp_dir.path().join("users.csv");
    let output = temp_dir.path().join("plans.csv");

    fs::write(
        &input,
        "age,gender,height_value,height_unit,weight_value,weight_unit,calories_intake\n\
         30,Male,180,cm,80,kg,2200\n\
         41,Other,160,cm,60,kg,1800\n",
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("--models-dir")
        .arg(&models_dir)
        .arg("batch")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Predicted 1 rows (1 failed)"));

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.contains("Strength"));
    assert!(content.contains("invalid_category"));
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let temp_dir = setup_test_dir();
    let models_dir = write_demo_models(temp_dir.path());

    let mut cmd = cli(temp_dir.path());
    cmd.env("RUST_LOG", "debug").arg("--models-dir").arg(&models_dir);
    predict_args(&mut cmd, "Male");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("FITNESS PLAN"))
        .stdout(predicate::str::contains("Using models directory").not())
        .stderr(predicate::str::contains("Using models directory"));
}
