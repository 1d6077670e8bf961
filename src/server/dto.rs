use serde::Deserialize;

use crate::types::{BucketSpec, Identity};

#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    pub given_name: String,
    pub family_name: String,
}

impl From<CreateAdminRequest> for Identity {
    fn from(req: CreateAdminRequest) -> Self {
        Self {
            given_name: req.given_name,
            family_name: req.family_name,
        }
    }
}

/// Fields left out fall back to the configured bucket.
#[derive(Debug, Default, Deserialize)]
pub struct EnsureBucketRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_read: Option<bool>,
    #[serde(default)]
    pub max_object_bytes: Option<u64>,
    #[serde(default)]
    pub allowed_content_types: Option<Vec<String>>,
}

impl EnsureBucketRequest {
    #[must_use]
    pub fn into_spec(self, base: &BucketSpec) -> BucketSpec {
        BucketSpec {
            name: self.name.unwrap_or_else(|| base.name.clone()),
            public_read: self.public_read.unwrap_or(base.public_read),
            max_object_bytes: self.max_object_bytes.unwrap_or(base.max_object_bytes),
            allowed_content_types: self
                .allowed_content_types
                .unwrap_or_else(|| base.allowed_content_types.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BucketStatusParams {
    /// Bypass the status cache.
    #[serde(default)]
    pub refresh: bool,
}
