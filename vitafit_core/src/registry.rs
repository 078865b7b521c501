//! Model registry: the read-only set of models and encoders shared by every
//! request, and the artifact files it is loaded from.
//!
//! Artifacts are JSON files in one models directory. They are read under a
//! shared lock and written atomically under an exclusive lock so a reader
//! never observes a half-written model.

use crate::decoder::{EXERCISE_CLASS_OUTPUTS, EXERCISE_REGRESSION_OUTPUTS};
use crate::diet::DietModels;
use crate::encoder::{EncoderSet, EXERCISE_FEATURE_COLUMNS, GENDER_COLUMN};
use crate::model::{Classifier, ForestClassifier, ForestRegressor, Regressor};
use crate::{Error, ProcessedFeatures, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const CLASSIFIER_FILE: &str = "multi_classifier.json";
pub const REGRESSOR_FILE: &str = "multi_regressor.json";
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
pub const DIET_MODEL_FILE: &str = "diet_model.json";
pub const DIET_LABEL_ENCODERS_FILE: &str = "diet_label_encoders.json";

/// Raw outputs of one model invocation, before decoding
#[derive(Clone, Debug, PartialEq)]
pub struct RawPrediction {
    pub class_outputs: Vec<usize>,
    pub regression_outputs: Vec<f64>,
}

/// Immutable models and encoders, built once and shared by reference
pub struct ModelRegistry {
    classifier: Box<dyn Classifier>,
    regressor: Box<dyn Regressor>,
    encoders: EncoderSet,
    diet: Option<DietModels>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("classifier_outputs", &self.classifier.output_names())
            .field("regressor_outputs", &self.regressor.output_names())
            .field("encoders", &self.encoders.columns().collect::<Vec<_>>())
            .field("diet", &self.diet.is_some())
            .finish()
    }
}

impl ModelRegistry {
    /// Assemble a registry, checking that models and encoders agree
    pub fn new(
        classifier: Box<dyn Classifier>,
        regressor: Box<dyn Regressor>,
        encoders: EncoderSet,
        diet: Option<DietModels>,
    ) -> Result<Self> {
        if !encoders.has_gender() {
            return Err(Error::ModelLoad(format!(
                "label encoders have no '{}' entry",
                GENDER_COLUMN
            )));
        }

        let width = EXERCISE_FEATURE_COLUMNS.len();
        if classifier.n_features() != width || regressor.n_features() != width {
            return Err(Error::ModelLoad(format!(
                "exercise models expect {}/{} features, pipeline provides {}",
                classifier.n_features(),
                regressor.n_features(),
                width
            )));
        }

        if classifier.output_names() != EXERCISE_CLASS_OUTPUTS {
            return Err(Error::ModelLoad(format!(
                "classifier outputs {:?}, expected {:?}",
                classifier.output_names(),
                EXERCISE_CLASS_OUTPUTS
            )));
        }
        if regressor.output_names() != EXERCISE_REGRESSION_OUTPUTS {
            return Err(Error::ModelLoad(format!(
                "regressor outputs {:?}, expected {:?}",
                regressor.output_names(),
                EXERCISE_REGRESSION_OUTPUTS
            )));
        }

        for (column, n_classes) in EXERCISE_CLASS_OUTPUTS.iter().zip(classifier.class_counts()) {
            let encoder = encoders.get(column).map_err(|_| {
                Error::ModelLoad(format!("label encoders have no '{}' entry", column))
            })?;
            if encoder.len() != n_classes {
                return Err(Error::ModelLoad(format!(
                    "classifier predicts {} classes for '{}' but its encoder has {}",
                    n_classes,
                    column,
                    encoder.len()
                )));
            }
        }

        Ok(Self {
            classifier,
            regressor,
            encoders,
            diet,
        })
    }

    /// Load every artifact from a models directory
    pub fn load_dir(dir: &Path) -> Result<Self> {
        ArtifactSet::load_dir(dir)?.into_registry()
    }

    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    pub fn diet(&self) -> Option<&DietModels> {
        self.diet.as_ref()
    }

    /// Run both exercise models on one feature set
    ///
    /// Any model failure is reported as `Error::Inference`.
    pub fn predict(&self, features: &ProcessedFeatures) -> Result<RawPrediction> {
        let vector = features.to_exercise_vector();

        let class_outputs = self
            .classifier
            .predict(&vector)
            .map_err(|e| wrap_inference("classifier", e))?;
        let regression_outputs = self
            .regressor
            .predict(&vector)
            .map_err(|e| wrap_inference("regressor", e))?;

        Ok(RawPrediction {
            class_outputs,
            regression_outputs,
        })
    }
}

fn wrap_inference(model: &str, err: Error) -> Error {
    match err {
        Error::Inference(msg) => Error::Inference(format!("{}: {}", model, msg)),
        other => Error::Inference(format!("{}: {}", model, other)),
    }
}

// ============================================================================
// Artifact Files
// ============================================================================

/// Serialized diet model and its encoders
#[derive(Clone, Debug)]
pub struct DietArtifacts {
    pub model: ForestRegressor,
    pub encoders: EncoderSet,
}

/// Concrete, serializable form of a registry
#[derive(Clone, Debug)]
pub struct ArtifactSet {
    pub classifier: ForestClassifier,
    pub regressor: ForestRegressor,
    pub encoders: EncoderSet,
    pub diet: Option<DietArtifacts>,
}

impl ArtifactSet {
    /// Read artifacts from `dir`
    ///
    /// The exercise artifacts are required. Diet artifacts are optional: if
    /// they are absent or unreadable the set is returned without them.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let classifier: ForestClassifier = read_artifact(&dir.join(CLASSIFIER_FILE))?;
        classifier.validate()?;
        let regressor: ForestRegressor = read_artifact(&dir.join(REGRESSOR_FILE))?;
        regressor.validate()?;
        let encoders: EncoderSet = read_artifact(&dir.join(LABEL_ENCODERS_FILE))?;

        tracing::info!("Loaded exercise models from {:?}", dir);

        let diet = match load_diet(dir) {
            Ok(diet) => diet,
            Err(e) => {
                tracing::warn!("Diet model not loaded from {:?}: {}", dir, e);
                None
            }
        };

        Ok(Self {
            classifier,
            regressor,
            encoders,
            diet,
        })
    }

    /// Write all artifacts into `dir`, creating it if needed
    pub fn save_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        write_artifact(&dir.join(CLASSIFIER_FILE), &self.classifier)?;
        write_artifact(&dir.join(REGRESSOR_FILE), &self.regressor)?;
        write_artifact(&dir.join(LABEL_ENCODERS_FILE), &self.encoders)?;

        if let Some(diet) = &self.diet {
            write_artifact(&dir.join(DIET_MODEL_FILE), &diet.model)?;
            write_artifact(&dir.join(DIET_LABEL_ENCODERS_FILE), &diet.encoders)?;
        }

        tracing::info!("Saved model artifacts to {:?}", dir);
        Ok(())
    }

    /// Validate every forest and assemble the registry
    ///
    /// Malformed exercise models are a `ModelLoad` error; a malformed diet
    /// model is dropped with a warning.
    pub fn into_registry(self) -> Result<ModelRegistry> {
        self.classifier.validate()?;
        self.regressor.validate()?;

        let diet = match self.diet {
            Some(d) => match d
                .model
                .validate()
                .and_then(|()| DietModels::new(Box::new(d.model), d.encoders))
            {
                Ok(models) => Some(models),
                Err(e) => {
                    tracing::warn!("Ignoring diet model: {}", e);
                    None
                }
            },
            None => None,
        };

        ModelRegistry::new(
            Box::new(self.classifier),
            Box::new(self.regressor),
            self.encoders,
            diet,
        )
    }
}

fn load_diet(dir: &Path) -> Result<Option<DietArtifacts>> {
    let model_path = dir.join(DIET_MODEL_FILE);
    let encoders_path = dir.join(DIET_LABEL_ENCODERS_FILE);

    match (model_path.exists(), encoders_path.exists()) {
        (false, false) => {
            tracing::info!("No diet model in {:?}", dir);
            Ok(None)
        }
        (true, true) => {
            let model: ForestRegressor = read_artifact(&model_path)?;
            model.validate()?;
            let encoders: EncoderSet = read_artifact(&encoders_path)?;
            tracing::info!("Loaded diet model from {:?}", dir);
            Ok(Some(DietArtifacts { model, encoders }))
        }
        _ => Err(Error::ModelLoad(format!(
            "diet model needs both {} and {}",
            DIET_MODEL_FILE, DIET_LABEL_ENCODERS_FILE
        ))),
    }
}

/// Read and parse one JSON artifact under a shared lock
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let load_err = |what: &str, e: &dyn fmt::Display| {
        Error::ModelLoad(format!("{} {:?}: {}", what, path, e))
    };

    let file = File::open(path).map_err(|e| load_err("cannot open artifact", &e))?;
    file.lock_shared()
        .map_err(|e| load_err("cannot lock artifact", &e))?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read.map_err(|e| load_err("cannot read artifact", &e))?;

    let value = serde_json::from_str(&contents)
        .map_err(|e| load_err("malformed artifact", &e))?;
    tracing::debug!("Read artifact {:?}", path);
    Ok(value)
}

/// Atomically replace `path` with the JSON form of `value`
pub fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "artifact path missing parent")
    })?;
    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote artifact {:?}", path);
    Ok(())
}

// ============================================================================
// Registry Sources
// ============================================================================

/// Something that can produce a fresh registry (the only step that does I/O)
pub trait RegistrySource: Send + Sync {
    fn load(&self) -> Result<ModelRegistry>;

    fn describe(&self) -> String {
        "custom model source".into()
    }
}

/// Loads artifacts from a models directory
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RegistrySource for DirectorySource {
    fn load(&self) -> Result<ModelRegistry> {
        if !self.dir.is_dir() {
            return Err(Error::ModelLoad(format!(
                "models directory {:?} does not exist",
                self.dir
            )));
        }
        ModelRegistry::load_dir(&self.dir)
    }

    fn describe(&self) -> String {
        format!("{}", self.dir.display())
    }
}

impl<F> RegistrySource for F
where
    F: Fn() -> Result<ModelRegistry> + Send + Sync,
{
    fn load(&self) -> Result<ModelRegistry> {
        self()
    }
}
