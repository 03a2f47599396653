// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::RegistryError;
use crate::template::{Template, UpdateOp};

/// Versioned template store.
///
/// Implementations hand out immutable snapshots so a pipeline keeps reading
/// the version it started with while updates land.
#[async_trait]
pub trait TemplateRegistry: Send + Sync {
    /// Stores `template` as the newest version of its stream.
    async fn register(&self, template: Template) -> Result<Arc<Template>, RegistryError>;

    async fn get_latest_template(&self, token: &str) -> Result<Arc<Template>, RegistryError>;

    async fn get_template(&self, token: &str, version: u32) -> Result<Arc<Template>, RegistryError>;

    /// Applies update ops to the latest version and stores the result.
    async fn update(&self, token: &str, ops: &[UpdateOp]) -> Result<Arc<Template>, RegistryError>;
}
