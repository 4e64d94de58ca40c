use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_FORMAT: &str = "rootfs";

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to read file at {path:?}: {source}")]
    ReadTags {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type ParamsResult<T> = Result<T, ParamsError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GetParams {
    #[serde(rename = "format", default, skip_serializing_if = "Option::is_none")]
    pub raw_format: Option<String>,
}

impl GetParams {
    /// The requested output format, [`DEFAULT_FORMAT`] unless set.
    pub fn format(&self) -> &str {
        match self.raw_format.as_deref() {
            Some(format) if !format.is_empty() => format,
            _ => DEFAULT_FORMAT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PutParams {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub additional_tags: String,
}

impl PutParams {
    /// Reads the whitespace separated tag list named by `additional_tags`,
    /// relative to `src`.
    pub async fn parse_tags(&self, src: impl AsRef<Path>) -> ParamsResult<Vec<String>> {
        if self.additional_tags.is_empty() {
            return Ok(Vec::new());
        }

        let path = src.as_ref().join(&self.additional_tags);

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ParamsError::ReadTags {
                path: path.clone(),
                source,
            })?;

        let tags = content
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();

        debug!(?path, count = tags.len(), "Parsed additional tags");

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "rootfs")]
    #[case(Some(""), "rootfs")]
    #[case(Some("oci"), "oci")]
    #[case(Some("rootfs"), "rootfs")]
    fn test_format(#[case] raw: Option<&str>, #[case] expected: &str) {
        let params = GetParams {
            raw_format: raw.map(str::to_string),
        };
        assert_eq!(params.format(), expected);
    }

    #[test]
    fn test_deserialize_get_params() {
        let params: GetParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.format(), "rootfs");

        let params: GetParams = serde_json::from_str(r#"{"format": "oci"}"#).unwrap();
        assert_eq!(params.format(), "oci");
    }

    #[tokio::test]
    async fn test_parse_tags_without_file() {
        let params = PutParams::default();
        let tags = params.parse_tags("/does/not/exist").await.unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_parse_tags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tags.txt"), "v1  v2\nv3").unwrap();

        let params = PutParams {
            image: "image/image.tar".into(),
            additional_tags: "tags.txt".into(),
        };

        let tags = params.parse_tags(dir.path()).await.unwrap();
        assert_eq!(tags, vec!["v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn test_parse_tags_ignores_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("meta")).unwrap();
        std::fs::write(dir.path().join("meta/tags"), "\n\t a \r\n\n b\t\n").unwrap();

        let params = PutParams {
            additional_tags: "meta/tags".into(),
            ..Default::default()
        };

        let tags = params.parse_tags(dir.path()).await.unwrap();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_parse_tags_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tags"), "  \n").unwrap();

        let params = PutParams {
            additional_tags: "tags".into(),
            ..Default::default()
        };

        assert!(params.parse_tags(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_tags_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let params = PutParams {
            additional_tags: "missing.txt".into(),
            ..Default::default()
        };

        let err = params.parse_tags(dir.path()).await.unwrap_err();
        let ParamsError::ReadTags { path, source } = &err;
        assert_eq!(path, &dir.path().join("missing.txt"));
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.txt"));
    }
}
