// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rule definitions, row partitioning and the stage engine.

pub mod engine;
pub mod partition;
pub mod rule;

pub use engine::{EngineOptions, EventCollisionPolicy, RuleEngine, StageOutcome};
pub use partition::{row_mask, Predicate};
pub use rule::{EventRule, FilterRule, Rule, TransformParams, OUTPUT_ROLE};
