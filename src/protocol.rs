use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::params::{GetParams, ParamsResult, PutParams};
use crate::source::{MetadataField, Source, Version};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
    #[serde(default)]
    pub params: GetParams,
}

impl InRequest {
    pub fn response(&self) -> Response {
        Response {
            version: self.version.clone(),
            metadata: self.source.metadata(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutRequest {
    pub source: Source,
    #[serde(default)]
    pub params: PutParams,
}

impl OutRequest {
    /// Describes a pushed image, listing its additional tags from `src`.
    pub async fn response(&self, digest: &str, src: impl AsRef<Path>) -> ParamsResult<Response> {
        let tags = self.params.parse_tags(src).await?;

        Ok(Response {
            version: Version::new(digest),
            metadata: self.source.metadata_with_additional_tags(&tags),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Response {
    pub version: Version,
    pub metadata: Vec<MetadataField>,
}
