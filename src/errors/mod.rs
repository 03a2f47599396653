// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod aggregate;
mod build;
mod config;
mod pipeline;
mod registry;
mod rules;
mod transform;
mod update;
mod validation;

pub use aggregate::AggregateError;
pub use build::BuildError;
pub use config::ConfigError;
pub use pipeline::{FailureStrategy, PipelineError, SinkError};
pub use registry::RegistryError;
pub use rules::RuleError;
pub use transform::TransformError;
pub use update::{DependencyKind, RuleKind, UpdateError, UpdateStatus, Violation};
pub use validation::ValidationError;
