//! Core domain types for the VitaFit prediction pipeline.
//!
//! This module defines the values that flow through one prediction request:
//! - Raw user input and its unit enums
//! - Canonical, processed features
//! - Decoded exercise and diet predictions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Categorical Types
// ============================================================================

/// Gender categories the exercise models were trained on
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the trained set
    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a submitted height value
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeightUnit {
    Cm,
    Inches,
    Feet,
    /// Anything else; converts to a canonical value of 0
    #[serde(other)]
    Unrecognized,
}

impl HeightUnit {
    /// Multiplier to centimetres, `None` for an unrecognized unit
    pub fn to_cm_factor(&self) -> Option<f64> {
        match self {
            HeightUnit::Cm => Some(1.0),
            HeightUnit::Inches => Some(2.54),
            HeightUnit::Feet => Some(30.48),
            HeightUnit::Unrecognized => None,
        }
    }
}

impl FromStr for HeightUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "cm" => HeightUnit::Cm,
            "inches" | "in" => HeightUnit::Inches,
            "feet" | "ft" => HeightUnit::Feet,
            _ => HeightUnit::Unrecognized,
        })
    }
}

/// Unit of a submitted weight value
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Kg,
    Lbs,
    #[serde(other)]
    Unrecognized,
}

impl WeightUnit {
    pub fn to_kg_factor(&self) -> Option<f64> {
        match self {
            WeightUnit::Kg => Some(1.0),
            WeightUnit::Lbs => Some(0.453592),
            WeightUnit::Unrecognized => None,
        }
    }
}

impl FromStr for WeightUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "kg" => WeightUnit::Kg,
            "lbs" | "lb" => WeightUnit::Lbs,
            _ => WeightUnit::Unrecognized,
        })
    }
}

// ============================================================================
// Request and Feature Types
// ============================================================================

/// Raw biometrics as submitted by the user
///
/// `gender` stays a string here: it is only resolved against the trained
/// category set by the feature encoder.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserInput {
    pub age: u32,
    pub gender: String,
    pub height_value: f64,
    pub height_unit: HeightUnit,
    pub weight_value: f64,
    pub weight_unit: WeightUnit,
    pub calories_intake: u32,
}

/// Canonical features derived from a `UserInput`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessedFeatures {
    pub age: u32,
    pub gender_code: i64,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// `None` when height or weight resolved to zero
    pub bmi: Option<f64>,
    pub calories_intake: u32,
}

// ============================================================================
// Prediction Types
// ============================================================================

/// Decoded output of the exercise models
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExercisePrediction {
    pub exercise_type: String,
    pub intensity_level: String,
    pub frequency_per_week: i64,
    pub duration_minutes: i64,
    pub estimated_calorie_burn: i64,
}

/// Decoded output of the diet model
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DietPrediction {
    pub recommended_calories: f64,
    pub protein_grams_per_day: f64,
    pub carbs_grams_per_day: f64,
    pub fats_grams_per_day: f64,
}

/// Result of the optional diet stage
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DietOutcome {
    Available { plan: DietPrediction },
    Unavailable { message: String },
    Failed { message: String },
}

impl DietOutcome {
    pub fn plan(&self) -> Option<&DietPrediction> {
        match self {
            DietOutcome::Available { plan } => Some(plan),
            _ => None,
        }
    }
}

/// Exercise plan plus the optional diet plan for one request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FitnessPlan {
    pub processed_features: ProcessedFeatures,
    pub exercise_plan: ExercisePrediction,
    pub diet_plan: DietOutcome,
}
