// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Pipelines allowed to run at once when the config does not say
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Upper bound on `pipeline.max_concurrency`
pub const MAX_CONCURRENCY_LIMIT: usize = 1024;
/// `tracing_subscriber` filter used when neither the config nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info";
