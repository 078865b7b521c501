//! Prediction service: owns the one-shot model load and serves requests.
//!
//! The registry is loaded at most once per successful load. Concurrent first
//! use collapses into a single load; a failed load leaves the slot empty so
//! a later request can try again.

use crate::pipeline;
use crate::record::PredictionRecord;
use crate::registry::{ModelRegistry, RegistrySource};
use crate::{Error, ExercisePrediction, FitnessPlan, Result, UserInput};
use once_cell::sync::OnceCell;

/// Shared entry point for request handlers
///
/// Wrap in an `Arc` to hand the same service to many threads.
pub struct PredictionService<S> {
    source: S,
    registry: OnceCell<ModelRegistry>,
    lazy_reload: bool,
}

impl<S: RegistrySource> PredictionService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            registry: OnceCell::new(),
            lazy_reload: true,
        }
    }

    /// Allow (default) or forbid loading on first request
    pub fn with_lazy_reload(mut self, enabled: bool) -> Self {
        self.lazy_reload = enabled;
        self
    }

    /// Load the models at process start
    ///
    /// Any failure is a `ModelLoad` error; the caller should refuse traffic.
    pub fn start(&self) -> Result<&ModelRegistry> {
        self.registry.get_or_try_init(|| self.load())
    }

    pub fn is_loaded(&self) -> bool {
        self.registry.get().is_some()
    }

    /// The loaded registry, without attempting a load
    pub fn registry(&self) -> Result<&ModelRegistry> {
        self.registry.get().ok_or_else(|| {
            Error::ModelsNotLoaded("Exercise models are not loaded".into())
        })
    }

    /// The loaded registry, loading it now if allowed
    pub fn registry_or_load(&self) -> Result<&ModelRegistry> {
        if let Some(registry) = self.registry.get() {
            return Ok(registry);
        }
        if !self.lazy_reload {
            return self.registry();
        }

        tracing::warn!("Models not loaded, attempting lazy reload");
        self.registry
            .get_or_try_init(|| self.load())
            .map_err(|e| Error::ModelsNotLoaded(format!("lazy reload failed: {}", e)))
    }

    pub fn predict_exercise(&self, input: &UserInput) -> Result<ExercisePrediction> {
        pipeline::predict_exercise(self.registry_or_load()?, input)
    }

    pub fn predict_plan(&self, input: &UserInput) -> Result<FitnessPlan> {
        pipeline::predict_plan(self.registry_or_load()?, input)
    }

    /// Predict and bundle the result with a fresh session id and timestamp
    pub fn predict_record(&self, input: &UserInput) -> Result<PredictionRecord> {
        let plan = self.predict_plan(input)?;
        Ok(PredictionRecord::new(input.clone(), plan))
    }

    fn load(&self) -> Result<ModelRegistry> {
        tracing::info!("Loading models from {}", self.source.describe());

        match self.source.load() {
            Ok(registry) => {
                tracing::info!("Models loaded: {:?}", registry);
                Ok(registry)
            }
            Err(Error::ModelLoad(msg)) => {
                tracing::error!("Model load failed: {}", msg);
                Err(Error::ModelLoad(msg))
            }
            Err(e) => {
                tracing::error!("Model load failed: {}", e);
                Err(Error::ModelLoad(e.to_string()))
            }
        }
    }
}
