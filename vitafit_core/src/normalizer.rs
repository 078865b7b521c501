//! Input normalization: unit conversion, BMI, and range checks.
//!
//! Unrecognized units are not an error. They resolve to a canonical value of
//! 0, which leaves the BMI undefined downstream.

use crate::{Error, HeightUnit, Result, UserInput, WeightUnit};

/// Oldest age accepted by the request schema
pub const MAX_AGE: u32 = 120;

/// Height and weight in canonical units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanonicalBody {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: Option<f64>,
}

/// Convert a height to centimetres (0 for an unrecognized unit)
pub fn height_to_cm(value: f64, unit: HeightUnit) -> f64 {
    unit.to_cm_factor().map(|f| value * f).unwrap_or(0.0)
}

/// Convert a weight to kilograms (0 for an unrecognized unit)
pub fn weight_to_kg(value: f64, unit: WeightUnit) -> f64 {
    unit.to_kg_factor().map(|f| value * f).unwrap_or(0.0)
}

/// BMI = kg / m², rounded to 2 decimals; `None` if either input is zero
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> Option<f64> {
    if height_cm <= 0.0 || weight_kg <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some(round_to(weight_kg / (height_m * height_m), 2))
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Check field ranges the way the request schema does
pub fn validate(input: &UserInput) -> Result<()> {
    if input.age == 0 || input.age >= MAX_AGE {
        return Err(Error::InvalidInput(format!(
            "age must be between 1 and {}, got {}",
            MAX_AGE - 1,
            input.age
        )));
    }
    if !(input.height_value.is_finite() && input.height_value > 0.0) {
        return Err(Error::InvalidInput(format!(
            "height_value must be positive, got {}",
            input.height_value
        )));
    }
    if !(input.weight_value.is_finite() && input.weight_value > 0.0) {
        return Err(Error::InvalidInput(format!(
            "weight_value must be positive, got {}",
            input.weight_value
        )));
    }
    if input.calories_intake == 0 {
        return Err(Error::InvalidInput(
            "calories_intake must be positive".into(),
        ));
    }
    Ok(())
}

/// Validate and convert the body measurements of a request
pub fn normalize(input: &UserInput) -> Result<CanonicalBody> {
    validate(input)?;

    let height_cm = height_to_cm(input.height_value, input.height_unit);
    let weight_kg = weight_to_kg(input.weight_value, input.weight_unit);

    if height_cm == 0.0 || weight_kg == 0.0 {
        tracing::debug!(
            "Unrecognized unit ({:?}/{:?}), leaving BMI blank",
            input.height_unit,
            input.weight_unit
        );
    }

    let bmi = compute_bmi(height_cm, weight_kg);
    let finite = height_cm.is_finite() && weight_kg.is_finite();
    if !finite || bmi.map_or(false, |b| !b.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "height {} {:?} and weight {} {:?} do not give a usable BMI",
            input.height_value, input.height_unit, input.weight_value, input.weight_unit
        )));
    }

    Ok(CanonicalBody {
        height_cm,
        weight_kg,
        bmi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(height: f64, hu: HeightUnit, weight: f64, wu: WeightUnit) -> UserInput {
        UserInput {
            age: 30,
            gender: "Male".into(),
            height_value: height,
            height_unit: hu,
            weight_value: weight,
            weight_unit: wu,
            calories_intake: 2200,
        }
    }

    #[test]
    fn test_metric_bmi_matches_formula() {
        for (h, w) in [(180.0, 80.0), (165.5, 58.2), (150.0, 95.0), (201.0, 110.3)] {
            let body = normalize(&input(h, HeightUnit::Cm, w, WeightUnit::Kg)).unwrap();
            let expected = ((w / ((h / 100.0) * (h / 100.0))) * 100.0).round() / 100.0;
            assert_eq!(body.bmi, Some(expected));
            assert_eq!(body.height_cm, h);
            assert_eq!(body.weight_kg, w);
        }
    }

    #[test]
    fn test_reference_bmi() {
        let body = normalize(&input(180.0, HeightUnit::Cm, 80.0, WeightUnit::Kg)).unwrap();
        assert_eq!(body.bmi, Some(24.69));
    }

    #[test]
    fn test_conversion_table() {
        assert_eq!(height_to_cm(10.0, HeightUnit::Cm), 10.0);
        assert!((height_to_cm(10.0, HeightUnit::Inches) - 25.4).abs() < 1e-9);
        assert!((height_to_cm(6.0, HeightUnit::Feet) - 182.88).abs() < 1e-9);
        assert_eq!(weight_to_kg(70.0, WeightUnit::Kg), 70.0);
        assert!((weight_to_kg(100.0, WeightUnit::Lbs) - 45.3592).abs() < 1e-9);
    }

    #[test]
    fn test_inches_round_trip() {
        let cm = height_to_cm(100.0, HeightUnit::Inches);
        assert!((cm / 2.54 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrecognized_unit_yields_zero_and_blank_bmi() {
        let body =
            normalize(&input(70.0, HeightUnit::Unrecognized, 80.0, WeightUnit::Kg)).unwrap();
        assert_eq!(body.height_cm, 0.0);
        assert_eq!(body.weight_kg, 80.0);
        assert_eq!(body.bmi, None);

        let body =
            normalize(&input(180.0, HeightUnit::Cm, 80.0, WeightUnit::Unrecognized)).unwrap();
        assert_eq!(body.weight_kg, 0.0);
        assert_eq!(body.bmi, None);
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let mut bad = input(180.0, HeightUnit::Cm, 80.0, WeightUnit::Kg);
        bad.age = 0;
        assert!(matches!(normalize(&bad), Err(Error::InvalidInput(_))));

        let mut bad = input(180.0, HeightUnit::Cm, 80.0, WeightUnit::Kg);
        bad.age = 120;
        assert!(matches!(normalize(&bad), Err(Error::InvalidInput(_))));

        let bad = input(-1.0, HeightUnit::Cm, 80.0, WeightUnit::Kg);
        assert!(matches!(normalize(&bad), Err(Error::InvalidInput(_))));

        let bad = input(180.0, HeightUnit::Cm, f64::NAN, WeightUnit::Kg);
        assert!(matches!(normalize(&bad), Err(Error::InvalidInput(_))));

        let mut bad = input(180.0, HeightUnit::Cm, 80.0, WeightUnit::Kg);
        bad.calories_intake = 0;
        assert!(matches!(normalize(&bad), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_extreme_values_are_invalid_input() {
        let tiny = input(1e-200, HeightUnit::Cm, 80.0, WeightUnit::Kg);
        let err = normalize(&tiny).unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(err, Error::InvalidInput(_)));

        let huge = input(180.0, HeightUnit::Cm, f64::MAX, WeightUnit::Lbs);
        assert!(matches!(normalize(&huge), Err(Error::InvalidInput(_))));

        let huge_height = input(f64::MAX, HeightUnit::Feet, 80.0, WeightUnit::Kg);
        assert!(matches!(normalize(&huge_height), Err(Error::InvalidInput(_))));
    }
}
