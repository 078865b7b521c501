//! Label encoders and feature-vector assembly.
//!
//! A `LabelEncoder` maps a category label to its position in a sorted class
//! list, matching the encoders the models were trained with. The gender
//! encoder is additionally resolved into an enum-keyed table at load time so
//! that a wrong category set is caught before any request is served.

use crate::normalizer::CanonicalBody;
use crate::{Error, Gender, ProcessedFeatures, Result, UserInput};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Column order of the exercise feature vector. Changing it invalidates the models.
pub const EXERCISE_FEATURE_COLUMNS: [&str; 6] = [
    "age",
    "gender",
    "height",
    "weight",
    "bmi",
    "calories_intake",
];

/// Encoder column names used by the exercise pipeline
pub const GENDER_COLUMN: &str = "gender";
pub const EXERCISE_TYPE_COLUMN: &str = "exercise_type";
pub const INTENSITY_LEVEL_COLUMN: &str = "intensity_level";

/// Ordered list of class labels; a label's code is its index
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code for an exact label match
    pub fn transform(&self, label: &str) -> Option<i64> {
        self.classes
            .iter()
            .position(|c| c == label)
            .map(|idx| idx as i64)
    }

    /// Label for a code produced by a model
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    fn validate(&self, column: &str) -> Result<()> {
        if self.classes.is_empty() {
            return Err(Error::Encoding(format!(
                "Encoder for '{}' has no classes",
                column
            )));
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.as_str()) {
                return Err(Error::Encoding(format!(
                    "Encoder for '{}' has duplicate class '{}'",
                    column, class
                )));
            }
        }
        Ok(())
    }
}

/// Gender lookup table validated against the trained category set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenderEncoder {
    codes: BTreeMap<Gender, i64>,
    labels: Vec<String>,
}

impl GenderEncoder {
    /// Build from a label encoder whose classes must be exactly {male, female}
    pub fn from_label_encoder(encoder: &LabelEncoder) -> Result<Self> {
        let mut codes = BTreeMap::new();

        for (idx, label) in encoder.classes.iter().enumerate() {
            let gender = Gender::parse(label).ok_or_else(|| {
                Error::Encoding(format!(
                    "Gender encoder has unexpected category '{}'",
                    label
                ))
            })?;
            if codes.insert(gender, idx as i64).is_some() {
                return Err(Error::Encoding(format!(
                    "Gender encoder lists '{}' more than once",
                    gender
                )));
            }
        }

        if let Some(missing) = Gender::ALL.iter().find(|g| !codes.contains_key(g)) {
            return Err(Error::Encoding(format!(
                "Gender encoder is missing category '{}'",
                missing
            )));
        }

        Ok(Self {
            codes,
            labels: encoder.classes.clone(),
        })
    }

    /// Encode a raw gender string (case-normalized)
    pub fn encode(&self, raw: &str) -> Result<i64> {
        Gender::parse(raw)
            .and_then(|g| self.codes.get(&g).copied())
            .ok_or_else(|| Error::InvalidCategory {
                column: GENDER_COLUMN.into(),
                value: raw.to_string(),
                valid: self.labels.clone(),
            })
    }

    pub fn code(&self, gender: Gender) -> i64 {
        self.codes[&gender]
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// All label encoders shipped with a model, keyed by column name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, LabelEncoder>",
    into = "BTreeMap<String, LabelEncoder>"
)]
pub struct EncoderSet {
    encoders: BTreeMap<String, LabelEncoder>,
    gender: Option<GenderEncoder>,
}

impl EncoderSet {
    /// Validate every encoder; a `gender` entry must hold exactly {male, female}
    pub fn from_map(encoders: BTreeMap<String, LabelEncoder>) -> Result<Self> {
        for (column, encoder) in &encoders {
            encoder.validate(column)?;
        }

        let gender = encoders
            .get(GENDER_COLUMN)
            .map(GenderEncoder::from_label_encoder)
            .transpose()?;

        Ok(Self { encoders, gender })
    }

    pub fn has_gender(&self) -> bool {
        self.gender.is_some()
    }

    pub fn gender(&self) -> Result<&GenderEncoder> {
        self.gender
            .as_ref()
            .ok_or_else(|| Error::Encoding("Gender label encoder not loaded".into()))
    }

    pub fn get(&self, column: &str) -> Result<&LabelEncoder> {
        self.encoders
            .get(column)
            .ok_or_else(|| Error::Encoding(format!("No label encoder for '{}'", column)))
    }

    /// Encode a label for `column`, rejecting values outside the trained set
    pub fn encode(&self, column: &str, label: &str) -> Result<i64> {
        let encoder = self.get(column)?;
        encoder
            .transform(label)
            .ok_or_else(|| Error::InvalidCategory {
                column: column.to_string(),
                value: label.to_string(),
                valid: encoder.classes.clone(),
            })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }
}

impl TryFrom<BTreeMap<String, LabelEncoder>> for EncoderSet {
    type Error = Error;

    fn try_from(map: BTreeMap<String, LabelEncoder>) -> Result<Self> {
        Self::from_map(map)
    }
}

impl From<EncoderSet> for BTreeMap<String, LabelEncoder> {
    fn from(set: EncoderSet) -> Self {
        set.encoders
    }
}

impl ProcessedFeatures {
    /// Numeric vector in `EXERCISE_FEATURE_COLUMNS` order; a blank BMI is fed as 0
    pub fn to_exercise_vector(&self) -> [f64; 6] {
        [
            f64::from(self.age),
            self.gender_code as f64,
            self.height_cm,
            self.weight_kg,
            self.bmi.unwrap_or(0.0),
            f64::from(self.calories_intake),
        ]
    }
}

/// Combine canonical measurements with the encoded gender
pub fn encode_features(
    input: &UserInput,
    body: &CanonicalBody,
    encoders: &EncoderSet,
) -> Result<ProcessedFeatures> {
    let gender_code = encoders.gender()?.encode(&input.gender)?;

    Ok(ProcessedFeatures {
        age: input.age,
        gender_code,
        height_cm: body.height_cm,
        weight_kg: body.weight_kg,
        bmi: body.bmi,
        calories_intake: input.calories_intake,
    })
}
