#![forbid(unsafe_code)]

//! Core prediction pipeline for the VitaFit fitness planner.
//!
//! This crate provides:
//! - Domain types (user input, processed features, predictions)
//! - Input normalization and feature encoding
//! - Model artifacts, the shared model registry and its one-shot loader
//! - Result decoding, diet recommendations and batch runs

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod normalizer;
pub mod encoder;
pub mod model;
pub mod decoder;
pub mod diet;
pub mod registry;
pub mod service;
pub mod pipeline;
pub mod record;
pub mod batch;
pub mod demo;

// Re-export commonly used types
pub use error::{Error, ErrorKind, ErrorReport, Result};
pub use types::*;
pub use config::Config;
pub use registry::{DirectorySource, ModelRegistry, RegistrySource};
pub use service::PredictionService;
pub use pipeline::{predict_exercise, predict_plan};
pub use record::PredictionRecord;
