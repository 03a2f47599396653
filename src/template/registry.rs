// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::{update_template, validate_template, Template, UpdateOp};
use crate::errors::{RegistryError, UpdateError};
use crate::observability::messages::template::{TemplateRegistered, TemplateUpdated, UpdateRejected};
use crate::observability::messages::StructuredLog;
use crate::traits::TemplateRegistry;
use crate::transforms::TransformRegistry;

type Versions = BTreeMap<u32, Arc<Template>>;

/// Process-local template store.
///
/// Every stream token owns its own mutex, so registrations and updates of
/// one stream are serialized while other streams proceed. Readers get
/// `Arc` snapshots that stay valid after newer versions land.
///
/// With a transform registry attached, every stored version is validated
/// first and rejected with [`RegistryError::Invalid`].
#[derive(Default)]
pub struct InMemoryTemplateRegistry {
    streams: RwLock<HashMap<String, Arc<Mutex<Versions>>>>,
    transforms: Option<Arc<TransformRegistry>>,
}

impl InMemoryTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(transforms: Arc<TransformRegistry>) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            transforms: Some(transforms),
        }
    }

    async fn entry(&self, token: &str) -> Arc<Mutex<Versions>> {
        if let Some(entry) = self.streams.read().await.get(token) {
            return Arc::clone(entry);
        }
        let mut streams = self.streams.write().await;
        Arc::clone(streams.entry(token.to_string()).or_default())
    }

    async fn existing(&self, token: &str) -> Result<Arc<Mutex<Versions>>, RegistryError> {
        self.streams
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownStream {
                token: token.to_string(),
            })
    }

    fn validate(&self, template: &Template) -> Result<(), RegistryError> {
        match &self.transforms {
            Some(transforms) => validate_template(template, transforms).map_err(|errors| RegistryError::Invalid {
                token: template.stream_token.clone(),
                errors,
            }),
            None => Ok(()),
        }
    }

    /// Number of versions stored for `token`.
    pub async fn version_count(&self, token: &str) -> usize {
        match self.existing(token).await {
            Ok(entry) => entry.lock().await.len(),
            Err(_) => 0,
        }
    }
}

fn latest(token: &str, versions: &Versions) -> Result<Arc<Template>, RegistryError> {
    versions
        .values()
        .next_back()
        .cloned()
        .ok_or_else(|| RegistryError::UnknownStream {
            token: token.to_string(),
        })
}

#[async_trait]
impl TemplateRegistry for InMemoryTemplateRegistry {
    async fn register(&self, template: Template) -> Result<Arc<Template>, RegistryError> {
        let entry = self.entry(&template.stream_token).await;
        let mut versions = entry.lock().await;

        if let Some(&newest) = versions.keys().next_back() {
            if template.version <= newest {
                return Err(RegistryError::VersionConflict {
                    token: template.stream_token.clone(),
                    latest: newest,
                    attempted: template.version,
                });
            }
        }
        self.validate(&template)?;

        TemplateRegistered {
            stream_token: &template.stream_token,
            version: template.version,
        }
        .log();

        let snapshot = Arc::new(template);
        versions.insert(snapshot.version, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn get_latest_template(&self, token: &str) -> Result<Arc<Template>, RegistryError> {
        let entry = self.existing(token).await?;
        let versions = entry.lock().await;
        latest(token, &versions)
    }

    async fn get_template(&self, token: &str, version: u32) -> Result<Arc<Template>, RegistryError> {
        let entry = self.existing(token).await?;
        let versions = entry.lock().await;
        versions
            .get(&version)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownVersion {
                token: token.to_string(),
                version,
            })
    }

    async fn update(&self, token: &str, ops: &[UpdateOp]) -> Result<Arc<Template>, RegistryError> {
        let entry = self.existing(token).await?;
        let mut versions = entry.lock().await;
        let current = latest(token, &versions)?;

        let updated = match update_template(&current, ops) {
            Ok(updated) => updated,
            Err(err) => {
                if let UpdateError::InvalidUpdate { violations } = &err {
                    UpdateRejected {
                        stream_token: token,
                        violation_count: violations.len(),
                    }
                    .log();
                }
                return Err(err.into());
            }
        };
        self.validate(&updated)?;

        TemplateUpdated {
            stream_token: token,
            from_version: current.version,
            to_version: updated.version,
            op_count: ops.len(),
        }
        .log();

        let snapshot = Arc::new(updated);
        versions.insert(snapshot.version, Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
