//! Serializable bundle of one prediction request and its results.

use crate::{DietOutcome, ExercisePrediction, FitnessPlan, ProcessedFeatures, UserInput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything produced for one request, keyed by a session id
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionRecord {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub raw_user_input: UserInput,
    pub processed_features: ProcessedFeatures,
    pub exercise_plan: ExercisePrediction,
    pub diet_plan: DietOutcome,
}

impl PredictionRecord {
    pub fn new(raw_user_input: UserInput, plan: FitnessPlan) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            raw_user_input,
            processed_features: plan.processed_features,
            exercise_plan: plan.exercise_plan,
            diet_plan: plan.diet_plan,
        }
    }

    /// Label/value pairs in report order, e.g. for a printed summary
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Exercise Type".to_string(), self.exercise_plan.exercise_type.clone()),
            (
                "Intensity Level".to_string(),
                self.exercise_plan.intensity_level.clone(),
            ),
            (
                "Frequency Per Week".to_string(),
                self.exercise_plan.frequency_per_week.to_string(),
            ),
            (
                "Duration Minutes".to_string(),
                self.exercise_plan.duration_minutes.to_string(),
            ),
            (
                "Estimated Calorie Burn".to_string(),
                self.exercise_plan.estimated_calorie_burn.to_string(),
            ),
        ];

        match &self.diet_plan {
            DietOutcome::Available { plan } => {
                rows.push((
                    "Recommended Calories".into(),
                    plan.recommended_calories.to_string(),
                ));
                rows.push((
                    "Protein Grams Per Day".into(),
                    plan.protein_grams_per_day.to_string(),
                ));
                rows.push((
                    "Carbs Grams Per Day".into(),
                    plan.carbs_grams_per_day.to_string(),
                ));
                rows.push((
                    "Fats Grams Per Day".into(),
                    plan.fats_grams_per_day.to_string(),
                ));
            }
            DietOutcome::Unavailable { message } | DietOutcome::Failed { message } => {
                rows.push(("Diet Plan".into(), message.clone()));
            }
        }

        rows
    }
}
