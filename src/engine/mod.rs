// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod coordinator;
pub mod sink;

pub use coordinator::{Coordinator, PipelineReport};
pub use sink::MemorySink;
