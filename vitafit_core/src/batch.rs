//! Batch predictions over a CSV of user inputs.
//!
//! Each row is predicted independently; a row that fails carries its error
//! in the `error` column and does not stop the batch.

use crate::normalizer::normalize;
use crate::pipeline::predict_plan;
use crate::registry::ModelRegistry;
use crate::{HeightUnit, Result, UserInput, WeightUnit};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// One input row as it appears in the CSV
#[derive(Debug, Deserialize)]
struct InputRow {
    age: u32,
    gender: String,
    height_value: f64,
    height_unit: String,
    weight_value: f64,
    weight_unit: String,
    calories_intake: u32,
}

impl From<&InputRow> for UserInput {
    fn from(row: &InputRow) -> Self {
        UserInput {
            age: row.age,
            gender: row.gender.clone(),
            height_value: row.height_value,
            height_unit: row.height_unit.parse().unwrap_or(HeightUnit::Unrecognized),
            weight_value: row.weight_value,
            weight_unit: row.weight_unit.parse().unwrap_or(WeightUnit::Unrecognized),
            calories_intake: row.calories_intake,
        }
    }
}

/// A row in the CSV output
#[derive(Debug, Default, Serialize)]
struct OutputRow {
    line: u64,
    age: Option<u32>,
    gender: Option<String>,
    height_value: Option<f64>,
    height_unit: Option<String>,
    weight_value: Option<f64>,
    weight_unit: Option<String>,
    calories_intake: Option<u32>,
    bmi: Option<f64>,
    exercise_type: Option<String>,
    intensity_level: Option<String>,
    frequency_per_week: Option<i64>,
    duration_minutes: Option<i64>,
    estimated_calorie_burn: Option<i64>,
    recommended_calories: Option<f64>,
    protein_grams_per_day: Option<f64>,
    carbs_grams_per_day: Option<f64>,
    fats_grams_per_day: Option<f64>,
    error: Option<String>,
}

impl OutputRow {
    fn echo(line: u64, row: &InputRow) -> Self {
        OutputRow {
            line,
            age: Some(row.age),
            gender: Some(row.gender.clone()),
            height_value: Some(row.height_value),
            height_unit: Some(row.height_unit.clone()),
            weight_value: Some(row.weight_value),
            weight_unit: Some(row.weight_unit.clone()),
            calories_intake: Some(row.calories_intake),
            ..Default::default()
        }
    }
}

/// Counts for a finished batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub failed: usize,
}

/// Predict every row of `reader` and write the results to `writer`
pub fn run_batch<R: Read, W: Write>(
    registry: &ModelRegistry,
    reader: R,
    writer: W,
) -> Result<BatchSummary> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut summary = BatchSummary::default();

    for result in csv_reader.deserialize::<InputRow>() {
        summary.rows += 1;
        // header is line 1
        let line = summary.rows as u64 + 1;

        let out = match result {
            Ok(row) => predict_row(registry, line, &row),
            Err(e) => OutputRow {
                line,
                error: Some(format!("unreadable row: {}", e)),
                ..Default::default()
            },
        };

        if out.error.is_some() {
            summary.failed += 1;
            tracing::debug!("Row {} failed: {:?}", line, out.error);
        }
        csv_writer.serialize(out)?;
    }

    csv_writer.flush()?;
    tracing::info!(
        "Batch finished: {} rows, {} failed",
        summary.rows,
        summary.failed
    );
    Ok(summary)
}

fn predict_row(registry: &ModelRegistry, line: u64, row: &InputRow) -> OutputRow {
    let input = UserInput::from(row);
    let mut out = OutputRow::echo(line, row);

    out.bmi = normalize(&input).ok().and_then(|body| body.bmi);

    match predict_plan(registry, &input) {
        Ok(plan) => {
            let exercise = plan.exercise_plan;
            out.exercise_type = Some(exercise.exercise_type);
            out.intensity_level = Some(exercise.intensity_level);
            out.frequency_per_week = Some(exercise.frequency_per_week);
            out.duration_minutes = Some(exercise.duration_minutes);
            out.estimated_calorie_burn = Some(exercise.estimated_calorie_burn);

            if let Some(diet) = plan.diet_plan.plan() {
                out.recommended_calories = Some(diet.recommended_calories);
                out.protein_grams_per_day = Some(diet.protein_grams_per_day);
                out.carbs_grams_per_day = Some(diet.carbs_grams_per_day);
                out.fats_grams_per_day = Some(diet.fats_grams_per_day);
            }
        }
        Err(e) => out.error = Some(format!("{}: {}", e.kind(), e)),
    }

    out
}

/// File-to-file convenience wrapper around `run_batch`
pub fn run_batch_files(
    registry: &ModelRegistry,
    input_path: &Path,
    output_path: &Path,
) -> Result<BatchSummary> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let input = std::fs::File::open(input_path)?;
    let output = std::fs::File::create(output_path)?;
    run_batch(
        registry,
        std::io::BufReader::new(input),
        std::io::BufWriter::new(output),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::build_demo_registry;

    const INPUT: &str = "\
age,gender,height_value,height_unit,weight_value,weight_unit,calories_intake
30,Male,180,cm,80,kg,2200
45,Female,65,inches,150,lbs,1900
28,unknown,170,cm,70,kg,2000
33,Male,170,furlongs,70,kg,2000
abc,Male,170,cm,70,kg,2000
";

    fn run() -> (BatchSummary, Vec<csv::StringRecord>, csv::StringRecord) {
        let registry = build_demo_registry().unwrap();
        let mut out = Vec::new();
        let summary = run_batch(&registry, INPUT.as_bytes(), &mut out).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        let records = reader.records().map(|r| r.unwrap()).collect();
        (summary, records, headers)
    }

    fn field<'a>(headers: &csv::StringRecord, record: &'a csv::StringRecord, name: &str) -> &'a str {
        let idx = headers.iter().position(|h| h == name).unwrap();
        &record[idx]
    }

    #[test]
    fn test_batch_counts_rows_and_failures() {
        let (summary, records, _) = run();
        assert_eq!(summary, BatchSummary { rows: 5, failed: 2 });
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_batch_successful_row() {
        let (_, records, headers) = run();
        let first = &records[0];

        assert_eq!(field(&headers, first, "line"), "2");
        assert_eq!(field(&headers, first, "bmi"), "24.69");
        assert_eq!(field(&headers, first, "exercise_type"), "Strength");
        assert_eq!(field(&headers, first, "estimated_calorie_burn"), "413");
        assert_eq!(field(&headers, first, "error"), "");
    }

    #[test]
    fn test_batch_failed_rows_carry_error() {
        let (_, records, headers) = run();

        let bad_gender = field(&headers, &records[2], "error");
        assert!(bad_gender.starts_with("invalid_category"));

        let unreadable = field(&headers, &records[4], "error");
        assert!(unreadable.starts_with("unreadable row"));
    }

    #[test]
    fn test_batch_unknown_unit_blank_bmi() {
        let (_, records, headers) = run();
        let row = &records[3];
        assert_eq!(field(&headers, row, "bmi"), "");
        assert_eq!(field(&headers, row, "error"), "");
        assert_eq!(field(&headers, row, "height_unit"), "furlongs");
    }

    #[test]
    fn test_batch_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input_path = temp_dir.path().join("users.csv");
        let output_path = temp_dir.path().join("out").join("plans.csv");
        std::fs::write(&input_path, INPUT).unwrap();

        let registry = build_demo_registry().unwrap();
        let summary = run_batch_files(&registry, &input_path, &output_path).unwrap();

        assert_eq!(summary.rows, 5);
        assert!(output_path.exists());
    }
}
