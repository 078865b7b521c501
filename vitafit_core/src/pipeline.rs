//! The request pipeline: normalize → encode → invoke → decode.
//!
//! Every stage is a pure function of its inputs and the shared registry.
//! Input errors are raised before the models run and no partial prediction
//! is ever returned.

use crate::decoder::decode_exercise;
use crate::encoder::encode_features;
use crate::normalizer::normalize;
use crate::registry::ModelRegistry;
use crate::{
    DietOutcome, ExercisePrediction, FitnessPlan, ProcessedFeatures, Result, UserInput,
};

/// Normalize and encode a request into canonical features
pub fn preprocess(registry: &ModelRegistry, input: &UserInput) -> Result<ProcessedFeatures> {
    let body = normalize(input)?;
    encode_features(input, &body, registry.encoders())
}

/// Predict an exercise plan for one request
pub fn predict_exercise(registry: &ModelRegistry, input: &UserInput) -> Result<ExercisePrediction> {
    let features = preprocess(registry, input)?;
    predict_from_features(registry, &features)
}

/// Run the models and decoder on already processed features
pub fn predict_from_features(
    registry: &ModelRegistry,
    features: &ProcessedFeatures,
) -> Result<ExercisePrediction> {
    let raw = registry.predict(features)?;
    tracing::debug!(
        "Raw exercise outputs: classes={:?} values={:?}",
        raw.class_outputs,
        raw.regression_outputs
    );
    decode_exercise(&raw.class_outputs, &raw.regression_outputs, registry.encoders())
}

/// Predict the exercise plan and, when a diet model is loaded, the diet plan
///
/// A diet failure is reported inside the plan and never fails the request.
pub fn predict_plan(registry: &ModelRegistry, input: &UserInput) -> Result<FitnessPlan> {
    let features = preprocess(registry, input)?;
    let exercise = predict_from_features(registry, &features)?;

    let diet_plan = match registry.diet() {
        None => DietOutcome::Unavailable {
            message: "Diet prediction model not available or not loaded.".into(),
        },
        Some(diet) => match diet.predict(registry.encoders(), input, &features, &exercise) {
            Ok(plan) => DietOutcome::Available { plan },
            Err(e) => {
                tracing::warn!("Error during diet prediction: {}", e);
                DietOutcome::Failed {
                    message: format!("Could not generate diet plan: {}", e),
                }
            }
        },
    };

    Ok(FitnessPlan {
        processed_features: features,
        exercise_plan: exercise,
        diet_plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::{build_demo_registry, demo_artifacts};
    use crate::encoder::EncoderSet;
    use crate::model::{Classifier, Regressor};
    use crate::{Error, HeightUnit, WeightUnit};

    fn input() -> UserInput {
        UserInput {
            age: 30,
            gender: "Male".into(),
            height_value: 180.0,
            height_unit: HeightUnit::Cm,
            weight_value: 80.0,
            weight_unit: WeightUnit::Kg,
            calories_intake: 2200,
        }
    }

    #[test]
    fn test_reference_features_give_whole_numbers() {
        let registry = build_demo_registry().unwrap();
        let features = ProcessedFeatures {
            age: 30,
            gender_code: 1,
            height_cm: 180.0,
            weight_kg: 80.0,
            bmi: Some(24.69),
            calories_intake: 2200,
        };

        let prediction = predict_from_features(&registry, &features).unwrap();

        assert_eq!(
            prediction,
            ExercisePrediction {
                exercise_type: "Strength".into(),
                intensity_level: "high".into(),
                frequency_per_week: 4,
                duration_minutes: 45,
                estimated_calorie_burn: 413,
            }
        );
    }

    #[test]
    fn test_end_to_end_matches_preprocessed_path() {
        let registry = build_demo_registry().unwrap();
        let features = preprocess(&registry, &input()).unwrap();

        assert_eq!(features.gender_code, 1);
        assert_eq!(features.bmi, Some(24.69));
        assert_eq!(
            predict_exercise(&registry, &input()).unwrap(),
            predict_from_features(&registry, &features).unwrap()
        );
    }

    #[test]
    fn test_imperial_units() {
        let registry = build_demo_registry().unwrap();
        let mut imperial = input();
        imperial.height_value = 6.0;
        imperial.height_unit = HeightUnit::Feet;
        imperial.weight_value = 176.0;
        imperial.weight_unit = WeightUnit::Lbs;

        let features = preprocess(&registry, &imperial).unwrap();
        assert!((features.height_cm - 182.88).abs() < 1e-9);
        assert!((features.weight_kg - 79.832192).abs() < 1e-9);
        assert_eq!(features.bmi, Some(23.87));
    }

    #[test]
    fn test_invalid_gender_fails_before_inference() {
        let registry = build_demo_registry().unwrap();
        let mut bad = input();
        bad.gender = "unknown".into();

        let err = predict_exercise(&registry, &bad).unwrap_err();
        assert!(matches!(err, Error::InvalidCategory { .. }));
    }

    #[test]
    fn test_unrecognized_unit_still_predicts_with_blank_bmi() {
        let registry = build_demo_registry().unwrap();
        let mut odd = input();
        odd.height_unit = HeightUnit::Unrecognized;

        let plan = predict_plan(&registry, &odd).unwrap();
        assert_eq!(plan.processed_features.height_cm, 0.0);
        assert_eq!(plan.processed_features.bmi, None);
    }

    #[test]
    fn test_plan_includes_diet() {
        let registry = build_demo_registry().unwrap();
        let plan = predict_plan(&registry, &input()).unwrap();

        let diet = plan.diet_plan.plan().unwrap();
        assert_eq!(diet.recommended_calories, 2450.12);
        assert_eq!(diet.protein_grams_per_day, 120.5);
        assert_eq!(diet.carbs_grams_per_day, 250.0);
        assert_eq!(diet.fats_grams_per_day, 70.33);
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn n_features(&self) -> usize {
            6
        }
        fn output_names(&self) -> Vec<&str> {
            vec!["exercise_type", "intensity_level"]
        }
        fn class_counts(&self) -> Vec<usize> {
            vec![4, 3]
        }
        fn predict(&self, _features: &[f64]) -> Result<Vec<usize>> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "tree walk exploded",
            )))
        }
    }

    #[test]
    fn test_model_failure_is_inference_error() {
        let artifacts = demo_artifacts().clone();
        let encoders: EncoderSet = artifacts.encoders.clone();
        let regressor: Box<dyn Regressor> = Box::new(artifacts.regressor.clone());
        let registry =
            ModelRegistry::new(Box::new(FailingClassifier), regressor, encoders, None).unwrap();

        let err = predict_exercise(&registry, &input()).unwrap_err();
        match err {
            Error::Inference(msg) => assert!(msg.contains("tree walk exploded")),
            other => panic!("expected Inference, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_without_diet_model() {
        let artifacts = demo_artifacts().clone();
        let registry = ModelRegistry::new(
            Box::new(artifacts.classifier),
            Box::new(artifacts.regressor),
            artifacts.encoders,
            None,
        )
        .unwrap();

        let plan = predict_plan(&registry, &input()).unwrap();
        assert!(matches!(plan.diet_plan, DietOutcome::Unavailable { .. }));
    }
}
