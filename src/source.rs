use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

pub const DEFAULT_TAG: &str = "latest";

/// The image a resource points at, plus the credentials needed to reach it.
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Source {
    pub repository: String,

    #[serde(rename = "tag", default, skip_serializing_if = "Option::is_none")]
    pub raw_tag: Option<Tag>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_trust: Option<ContentTrust>,

    #[serde(default)]
    pub debug: bool,
}

impl Source {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.raw_tag = Some(tag.into());
        self
    }

    /// The configured tag, or [`DEFAULT_TAG`] when it is missing or empty.
    pub fn tag(&self) -> &str {
        match &self.raw_tag {
            Some(tag) if !tag.is_empty() => tag.as_str(),
            _ => DEFAULT_TAG,
        }
    }

    /// `<repository>:<tag>`, for display only.
    pub fn name(&self) -> String {
        format!("{}:{}", self.repository, self.tag())
    }

    pub fn metadata(&self) -> Vec<MetadataField> {
        vec![
            MetadataField::new("repository", &self.repository),
            MetadataField::new("tag", self.tag()),
        ]
    }

    /// Like [`Source::metadata`], but reports every tag the image was pushed
    /// under. The primary tag always comes last.
    pub fn metadata_with_additional_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<MetadataField> {
        let tags = tags
            .iter()
            .map(|tag| tag.as_ref())
            .chain(std::iter::once(self.tag()))
            .collect::<Vec<_>>()
            .join(" ");

        vec![
            MetadataField::new("repository", &self.repository),
            MetadataField::new("tags", tags),
        ]
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("repository", &self.repository)
            .field("tag", &self.raw_tag)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("content_trust", &self.content_trust)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Signing material for one registry's notary server.
#[derive(Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContentTrust {
    pub server: String,
    pub repository_key_id: String,
    pub repository_key: String,
    pub repository_passphrase: String,
    #[serde(default)]
    pub tls_key: String,
    #[serde(default)]
    pub tls_cert: String,
}

impl fmt::Debug for ContentTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentTrust")
            .field("server", &self.server)
            .field("repository_key_id", &self.repository_key_id)
            .field("repository_key", &redacted(&self.repository_key))
            .field("repository_passphrase", &redacted(&self.repository_passphrase))
            .field("tls_key", &redacted(&self.tls_key))
            .field("tls_cert", &self.tls_cert)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Version {
    pub digest: String,
}

impl Version {
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

impl MetadataField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
