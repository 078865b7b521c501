//! Built-in reference model set.
//!
//! A handful of shallow trees with the same shape as the exported production
//! artifacts. Used to exercise the pipeline end to end and by
//! `vitafit demo-models` to bootstrap a models directory.

use crate::encoder::{EncoderSet, LabelEncoder};
use crate::model::{
    ClassifierOutput, DecisionTree, ForestClassifier, ForestRegressor, Node, RegressorOutput,
};
use crate::registry::{ArtifactSet, DietArtifacts, ModelRegistry};
use crate::Result;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Cached demo artifacts - built once and reused
static DEMO_ARTIFACTS: Lazy<ArtifactSet> = Lazy::new(build_demo_artifacts);

// Feature indices in the exercise vector
const AGE: usize = 0;
const WEIGHT: usize = 3;
const BMI: usize = 4;
const CALORIES: usize = 5;

// Extra feature indices in the diet vector
const ACTIVITY: usize = 9;

/// Get a reference to the cached demo artifacts
pub fn demo_artifacts() -> &'static ArtifactSet {
    &DEMO_ARTIFACTS
}

/// Build a registry from the demo artifacts
pub fn build_demo_registry() -> Result<ModelRegistry> {
    demo_artifacts().clone().into_registry()
}

fn leaf(value: Vec<f64>) -> Node {
    Node::Leaf { value }
}

fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Node {
    Node::Split {
        feature,
        threshold,
        left,
        right,
    }
}

fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
    DecisionTree {
        nodes: vec![split(feature, threshold, 1, 2), leaf(left), leaf(right)],
    }
}

fn constant(value: f64) -> DecisionTree {
    DecisionTree {
        nodes: vec![leaf(vec![value])],
    }
}

fn encoders(entries: &[(&str, &[&str])]) -> EncoderSet {
    let map: BTreeMap<String, LabelEncoder> = entries
        .iter()
        .map(|(column, classes)| (column.to_string(), LabelEncoder::new(classes.iter().copied())))
        .collect();
    EncoderSet::from_map(map).expect("demo class lists are unique and non-empty")
}

fn build_demo_artifacts() -> ArtifactSet {
    const EXERCISE_TYPES: &[&str] = &["Cardio", "HIIT", "Strength", "Yoga"];
    const INTENSITIES: &[&str] = &["high", "low", "medium"];

    // ========================================================================
    // Exercise classifier
    // ========================================================================

    let exercise_type = ClassifierOutput {
        name: "exercise_type".into(),
        n_classes: EXERCISE_TYPES.len(),
        trees: vec![
            DecisionTree {
                nodes: vec![
                    split(BMI, 25.0, 1, 4),
                    split(AGE, 40.0, 2, 3),
                    leaf(vec![0.1, 0.2, 0.6, 0.1]),
                    leaf(vec![0.2, 0.0, 0.2, 0.6]),
                    leaf(vec![0.7, 0.1, 0.1, 0.1]),
                ],
            },
            stump(
                CALORIES,
                2500.0,
                vec![0.3, 0.3, 0.3, 0.1],
                vec![0.1, 0.6, 0.2, 0.1],
            ),
        ],
    };

    let intensity_level = ClassifierOutput {
        name: "intensity_level".into(),
        n_classes: INTENSITIES.len(),
        trees: vec![stump(AGE, 35.0, vec![0.6, 0.1, 0.3], vec![0.1, 0.4, 0.5])],
    };

    let classifier = ForestClassifier {
        n_features: 6,
        outputs: vec![exercise_type, intensity_level],
    };

    // ========================================================================
    // Exercise regressor
    // ========================================================================

    let regressor = ForestRegressor {
        n_features: 6,
        outputs: vec![
            RegressorOutput {
                name: "frequency_per_week".into(),
                trees: vec![stump(BMI, 25.0, vec![4.2], vec![3.4])],
            },
            RegressorOutput {
                name: "duration_minutes".into(),
                trees: vec![
                    stump(AGE, 40.0, vec![45.3], vec![35.6]),
                    stump(CALORIES, 2000.0, vec![40.0], vec![45.3]),
                ],
            },
            RegressorOutput {
                name: "estimated_calorie_burn".into(),
                trees: vec![stump(WEIGHT, 90.0, vec![412.46], vec![520.04])],
            },
        ],
    };

    let exercise_encoders = encoders(&[
        ("gender", &["Female", "Male"][..]),
        ("exercise_type", EXERCISE_TYPES),
        ("intensity_level", INTENSITIES),
    ]);

    // ========================================================================
    // Diet regressor
    // ========================================================================

    let diet_model = ForestRegressor {
        n_features: 10,
        outputs: vec![
            RegressorOutput {
                name: "recommended_calories".into(),
                trees: vec![stump(CALORIES, 2000.0, vec![2100.456], vec![2450.123])],
            },
            RegressorOutput {
                name: "protein_grams_per_day".into(),
                trees: vec![stump(WEIGHT, 80.0, vec![120.5], vec![150.25])],
            },
            RegressorOutput {
                name: "carbs_grams_per_day".into(),
                trees: vec![stump(ACTIVITY, 1.5, vec![250.0], vec![300.0])],
            },
            RegressorOutput {
                name: "fats_grams_per_day".into(),
                trees: vec![constant(70.333)],
            },
        ],
    };

    let diet_encoders = encoders(&[
        ("gender", &["Female", "Male"][..]),
        ("exercise_type", EXERCISE_TYPES),
        ("intensity_level", INTENSITIES),
        (
            "activity_level",
            &["light", "moderate", "sedentary", "very active"][..],
        ),
    ]);

    ArtifactSet {
        classifier,
        regressor,
        encoders: exercise_encoders,
        diet: Some(DietArtifacts {
            model: diet_model,
            encoders: diet_encoders,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_artifacts_validate() {
        let artifacts = demo_artifacts();
        artifacts.classifier.validate().unwrap();
        artifacts.regressor.validate().unwrap();
        artifacts.diet.as_ref().unwrap().model.validate().unwrap();
    }

    #[test]
    fn test_demo_registry_builds_with_diet() {
        let registry = build_demo_registry().unwrap();
        assert!(registry.diet().is_some());
        assert!(registry.encoders().has_gender());
    }
}
