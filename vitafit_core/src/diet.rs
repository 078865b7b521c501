//! Diet recommendations derived from an exercise prediction.
//!
//! The diet model is optional. It consumes the processed exercise features
//! plus the decoded exercise plan and an activity level inferred from it.

use crate::encoder::{EncoderSet, EXERCISE_TYPE_COLUMN, INTENSITY_LEVEL_COLUMN};
use crate::model::Regressor;
use crate::normalizer::round_to;
use crate::{DietPrediction, Error, ExercisePrediction, ProcessedFeatures, Result, UserInput};
use std::fmt;

/// Column order of the diet feature vector
pub const DIET_FEATURE_COLUMNS: [&str; 10] = [
    "age",
    "gender",
    "height",
    "weight",
    "bmi",
    "calories_intake",
    "exercise_type",
    "intensity_level",
    "frequency_per_week",
    "activity_level",
];

/// Diet regressor output columns, in order
pub const DIET_OUTPUTS: [&str; 4] = [
    "recommended_calories",
    "protein_grams_per_day",
    "carbs_grams_per_day",
    "fats_grams_per_day",
];

pub const ACTIVITY_LEVEL_COLUMN: &str = "activity_level";

/// Activity level the diet model was trained with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    VeryActive,
    Moderate,
    Light,
    Sedentary,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::VeryActive => "very active",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Light => "light",
            ActivityLevel::Sedentary => "sedentary",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer an activity level from weekly frequency and intensity
///
/// Must agree with the rule used to label the diet training data.
pub fn infer_activity_level(frequency_per_week: i64, intensity_level: &str) -> ActivityLevel {
    let intensity = intensity_level.to_lowercase();

    if frequency_per_week >= 5 && intensity == "high" {
        ActivityLevel::VeryActive
    } else if frequency_per_week >= 3 && (intensity == "medium" || intensity == "high") {
        ActivityLevel::Moderate
    } else if frequency_per_week <= 2 {
        ActivityLevel::Light
    } else {
        ActivityLevel::Sedentary
    }
}

/// Diet regressor and the encoders for its categorical inputs
pub struct DietModels {
    regressor: Box<dyn Regressor>,
    encoders: EncoderSet,
}

impl DietModels {
    pub fn new(regressor: Box<dyn Regressor>, encoders: EncoderSet) -> Result<Self> {
        if regressor.n_features() != DIET_FEATURE_COLUMNS.len() {
            return Err(Error::ModelLoad(format!(
                "diet model expects {} features, pipeline provides {}",
                regressor.n_features(),
                DIET_FEATURE_COLUMNS.len()
            )));
        }
        if regressor.output_names() != DIET_OUTPUTS {
            return Err(Error::ModelLoad(format!(
                "diet model outputs {:?}, expected {:?}",
                regressor.output_names(),
                DIET_OUTPUTS
            )));
        }
        for column in [
            EXERCISE_TYPE_COLUMN,
            INTENSITY_LEVEL_COLUMN,
            ACTIVITY_LEVEL_COLUMN,
        ] {
            if encoders.get(column).is_err() {
                return Err(Error::ModelLoad(format!(
                    "diet label encoders have no '{}' entry",
                    column
                )));
            }
        }
        Ok(Self {
            regressor,
            encoders,
        })
    }

    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    /// Predict daily calories and macros for an already decoded exercise plan
    pub fn predict(
        &self,
        exercise_encoders: &EncoderSet,
        input: &UserInput,
        features: &ProcessedFeatures,
        exercise: &ExercisePrediction,
    ) -> Result<DietPrediction> {
        let activity = infer_activity_level(exercise.frequency_per_week, &exercise.intensity_level);

        let gender_code = self.gender_code(exercise_encoders, input, features)?;
        let exercise_type = self
            .encoders
            .encode(EXERCISE_TYPE_COLUMN, &exercise.exercise_type)?;
        let intensity = self
            .encoders
            .encode(INTENSITY_LEVEL_COLUMN, &exercise.intensity_level)?;
        let activity_code = self
            .encoders
            .encode(ACTIVITY_LEVEL_COLUMN, activity.as_str())?;

        let vector = [
            f64::from(features.age),
            gender_code as f64,
            features.height_cm,
            features.weight_kg,
            features.bmi.unwrap_or(0.0),
            f64::from(features.calories_intake),
            exercise_type as f64,
            intensity as f64,
            exercise.frequency_per_week as f64,
            activity_code as f64,
        ];

        tracing::debug!("Diet features ({}): {:?}", activity, vector);

        let raw = self
            .regressor
            .predict(&vector)
            .map_err(|e| Error::Inference(format!("diet model: {}", e)))?;

        if raw.len() != DIET_OUTPUTS.len() || raw.iter().any(|v| !v.is_finite()) {
            return Err(Error::Inference(format!(
                "diet model returned unusable output {:?}",
                raw
            )));
        }

        Ok(DietPrediction {
            recommended_calories: round_to(raw[0], 2),
            protein_grams_per_day: round_to(raw[1], 2),
            carbs_grams_per_day: round_to(raw[2], 2),
            fats_grams_per_day: round_to(raw[3], 2),
        })
    }

    /// Reuse the exercise gender code unless the diet encoder orders classes differently
    fn gender_code(
        &self,
        exercise_encoders: &EncoderSet,
        input: &UserInput,
        features: &ProcessedFeatures,
    ) -> Result<i64> {
        if !self.encoders.has_gender() {
            return Ok(features.gender_code);
        }
        let diet_gender = self.encoders.gender()?;
        let same_classes = exercise_encoders
            .gender()
            .map(|g| g.labels() == diet_gender.labels())
            .unwrap_or(false);

        if same_classes {
            Ok(features.gender_code)
        } else {
            diet_gender.encode(&input.gender)
        }
    }
}
