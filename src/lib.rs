// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod batch;      // aggregation + columns
pub mod config;     // engine config loading
pub mod engine;     // coordinator + sinks
pub mod errors;     // error handling
pub mod observability;
pub mod record;
pub mod rules;      // filter / derive / detect stages
pub mod template;   // templates, builder, mutator, registry
pub mod traits;     // registry, sink and transform seams
pub mod transforms; // built-in transform library
