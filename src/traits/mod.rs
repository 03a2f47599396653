// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod registry;
pub mod sink;
pub mod transform;

pub use registry::TemplateRegistry;
pub use sink::ResultSink;
pub use transform::{Transform, TransformStage};
