//! Turn raw model outputs back into an `ExercisePrediction`.

use crate::encoder::{EncoderSet, EXERCISE_TYPE_COLUMN, INTENSITY_LEVEL_COLUMN};
use crate::normalizer::round_to;
use crate::{Error, ExercisePrediction, Result};

/// Classifier output columns, in order
pub const EXERCISE_CLASS_OUTPUTS: [&str; 2] = [EXERCISE_TYPE_COLUMN, INTENSITY_LEVEL_COLUMN];

/// Regressor output columns, in order
pub const EXERCISE_REGRESSION_OUTPUTS: [&str; 3] = [
    "frequency_per_week",
    "duration_minutes",
    "estimated_calorie_burn",
];

/// Decode class indices and regression values for one request
pub fn decode_exercise(
    class_outputs: &[usize],
    regression_outputs: &[f64],
    encoders: &EncoderSet,
) -> Result<ExercisePrediction> {
    if class_outputs.len() != EXERCISE_CLASS_OUTPUTS.len() {
        return Err(Error::Inference(format!(
            "classifier returned {} outputs, expected {}",
            class_outputs.len(),
            EXERCISE_CLASS_OUTPUTS.len()
        )));
    }
    if regression_outputs.len() != EXERCISE_REGRESSION_OUTPUTS.len() {
        return Err(Error::Inference(format!(
            "regressor returned {} outputs, expected {}",
            regression_outputs.len(),
            EXERCISE_REGRESSION_OUTPUTS.len()
        )));
    }

    let exercise_type = decode_label(encoders, EXERCISE_TYPE_COLUMN, class_outputs[0])?;
    let intensity_level = decode_label(encoders, INTENSITY_LEVEL_COLUMN, class_outputs[1])?;

    Ok(ExercisePrediction {
        exercise_type,
        intensity_level,
        frequency_per_week: to_whole(EXERCISE_REGRESSION_OUTPUTS[0], regression_outputs[0])?,
        duration_minutes: to_whole(EXERCISE_REGRESSION_OUTPUTS[1], regression_outputs[1])?,
        // one rounding at 1 decimal, then to the reported integer
        estimated_calorie_burn: to_whole(
            EXERCISE_REGRESSION_OUTPUTS[2],
            round_to(regression_outputs[2], 1),
        )?,
    })
}

fn decode_label(encoders: &EncoderSet, column: &str, code: usize) -> Result<String> {
    let encoder = encoders.get(column)?;
    encoder
        .inverse_transform(code)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Inference(format!(
                "class index {} for '{}' is outside the {} known labels",
                code,
                column,
                encoder.len()
            ))
        })
}

fn to_whole(name: &str, value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(Error::Inference(format!(
            "regressor produced a non-finite {}",
            name
        )));
    }
    Ok(value.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LabelEncoder;
    use std::collections::BTreeMap;

    fn encoders() -> EncoderSet {
        let mut map = BTreeMap::new();
        map.insert("gender".into(), LabelEncoder::new(["Female", "Male"]));
        map.insert(
            "exercise_type".into(),
            LabelEncoder::new(["Cardio", "HIIT", "Strength", "Yoga"]),
        );
        map.insert(
            "intensity_level".into(),
            LabelEncoder::new(["high", "low", "medium"]),
        );
        EncoderSet::from_map(map).unwrap()
    }

    #[test]
    fn test_decode_labels_and_rounding() {
        let prediction = decode_exercise(&[2, 0], &[3.6, 44.5, 412.46], &encoders()).unwrap();

        assert_eq!(prediction.exercise_type, "Strength");
        assert_eq!(prediction.intensity_level, "high");
        assert_eq!(prediction.frequency_per_week, 4);
        assert_eq!(prediction.duration_minutes, 45);
        // 412.46 -> 412.5 -> 413
        assert_eq!(prediction.estimated_calorie_burn, 413);
    }

    #[test]
    fn test_out_of_range_class_is_inference_error() {
        let err = decode_exercise(&[9, 0], &[3.0, 30.0, 200.0], &encoders()).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_non_finite_regression_is_inference_error() {
        let err = decode_exercise(&[0, 0], &[f64::NAN, 30.0, 200.0], &encoders()).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[test]
    fn test_wrong_output_width_is_inference_error() {
        assert!(matches!(
            decode_exercise(&[0], &[3.0, 30.0, 200.0], &encoders()),
            Err(Error::Inference(_))
        ));
        assert!(matches!(
            decode_exercise(&[0, 0], &[3.0, 30.0], &encoders()),
            Err(Error::Inference(_))
        ));
    }
}
