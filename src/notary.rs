use std::collections::BTreeMap;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Host;

use crate::source::ContentTrust;

pub const NOTARY_FOLDER: &str = ".notary";
pub const CONFIG_FILE: &str = "gcr-config.json";
pub const TRUST_FOLDER: &str = "trust";
pub const PRIVATE_FOLDER: &str = "private";
pub const TLS_FOLDER: &str = "tls";
pub const CLIENT_CERT_FILE: &str = "client.cert";
pub const CLIENT_KEY_FILE: &str = "client.key";

const DIR_MODE: u32 = 0o777;
const PUBLIC_FILE_MODE: u32 = 0o644;
const PRIVATE_FILE_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum NotaryError {
    #[error("Invalid notary server url {server:?}: {source}")]
    InvalidServerUrl {
        server: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to resolve destination {path:?}: {source}")]
    ResolveDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write file {path:?}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to encode notary config")]
    EncodeConfig(#[from] serde_json::Error),
}

pub type NotaryResult<T> = Result<T, NotaryError>;

/// One filesystem step of building the notary config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    CreateDir {
        path: PathBuf,
        recursive: bool,
    },
    WriteFile {
        path: PathBuf,
        contents: Vec<u8>,
        mode: u32,
    },
}

impl Directive {
    pub fn path(&self) -> &Path {
        match self {
            Directive::CreateDir { path, .. } | Directive::WriteFile { path, .. } => path,
        }
    }

    async fn apply(&self) -> NotaryResult<()> {
        match self {
            Directive::CreateDir { path, recursive } => {
                debug!(?path, recursive, "Creating directory");

                let mut builder = tokio::fs::DirBuilder::new();
                builder.recursive(*recursive);
                #[cfg(unix)]
                builder.mode(DIR_MODE);

                builder
                    .create(path)
                    .await
                    .map_err(|source| NotaryError::CreateDir {
                        path: path.clone(),
                        source,
                    })
            }
            Directive::WriteFile {
                path,
                contents,
                mode,
            } => {
                debug!(?path, mode = %format!("{mode:o}"), "Writing file");

                write_new_file(path, contents, *mode)
                    .await
                    .map_err(|source| NotaryError::WriteFile {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

async fn write_new_file(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).await?;
    #[cfg(unix)]
    file.set_permissions(std::fs::Permissions::from_mode(mode)).await?;
    file.write_all(contents).await?;
    file.flush().await?;

    Ok(())
}

/// The planned contents of a notary config directory:
///
/// ```text
/// .notary
/// ├── gcr-config.json
/// ├── trust
/// │   └── private
/// │       └── <repository-key-id>.key
/// └── tls
///     └── <notary-host>
///         ├── client.cert
///         └── client.key
/// ```
///
/// Planning touches nothing on disk; [`NotaryLayout::apply`] performs the
/// steps in order and stops at the first failure without undoing earlier
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotaryLayout {
    config_dir: PathBuf,
    directives: Vec<Directive>,
}

impl NotaryLayout {
    pub fn plan(trust: &ContentTrust, dest: impl AsRef<Path>) -> NotaryResult<Self> {
        let dest = dest.as_ref();
        let dest = std::path::absolute(dest).map_err(|source| NotaryError::ResolveDestination {
            path: dest.to_path_buf(),
            source,
        })?;

        let host = notary_host(&trust.server)?;

        let config_dir = dest.join(NOTARY_FOLDER);
        let private_dir = config_dir.join(TRUST_FOLDER).join(PRIVATE_FOLDER);

        let mut directives = vec![
            Directive::CreateDir {
                path: config_dir.clone(),
                recursive: false,
            },
            Directive::WriteFile {
                path: config_dir.join(CONFIG_FILE),
                contents: config_json(trust)?,
                mode: PUBLIC_FILE_MODE,
            },
            Directive::CreateDir {
                path: private_dir.clone(),
                recursive: true,
            },
            Directive::WriteFile {
                path: private_dir.join(format!("{}.key", trust.repository_key_id)),
                contents: trust.repository_key.as_bytes().to_vec(),
                mode: PRIVATE_FILE_MODE,
            },
        ];

        if let Some(host) = host {
            let cert_dir = config_dir.join(TLS_FOLDER).join(host);

            directives.extend([
                Directive::CreateDir {
                    path: cert_dir.clone(),
                    recursive: true,
                },
                Directive::WriteFile {
                    path: cert_dir.join(CLIENT_CERT_FILE),
                    contents: trust.tls_cert.as_bytes().to_vec(),
                    mode: PUBLIC_FILE_MODE,
                },
                Directive::WriteFile {
                    path: cert_dir.join(CLIENT_KEY_FILE),
                    contents: trust.tls_key.as_bytes().to_vec(),
                    mode: PUBLIC_FILE_MODE,
                },
            ]);
        }

        Ok(Self {
            config_dir,
            directives,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub async fn apply(self) -> NotaryResult<PathBuf> {
        for directive in &self.directives {
            directive.apply().await?;
        }

        info!(config_dir = ?self.config_dir, "Prepared notary config directory");

        Ok(self.config_dir)
    }
}

impl ContentTrust {
    /// Writes the notary client configuration under `dest` and returns the
    /// path of the created `.notary` directory.
    ///
    /// Fails if `dest/.notary` already exists.
    pub async fn prepare_config_dir(&self, dest: impl AsRef<Path>) -> NotaryResult<PathBuf> {
        NotaryLayout::plan(self, dest)?.apply().await
    }
}

/// The repository key itself only goes to the private key file.
fn config_json(trust: &ContentTrust) -> NotaryResult<Vec<u8>> {
    let config = BTreeMap::from([
        ("server_url", trust.server.as_str()),
        ("root_passphrase", ""),
        ("repository_passphrase", trust.repository_passphrase.as_str()),
    ]);

    Ok(serde_json::to_vec(&config)?)
}

/// The host component of the notary server, exactly as written.
///
/// This is the authority between `//` and the next `/`, `?` or `#`, minus
/// any `userinfo@`. Case and port are preserved so the directory name
/// matches what the signing client derives from the same server string.
/// References without an authority, such as a bare path, carry no host and
/// need no TLS client files.
fn notary_host(server: &str) -> NotaryResult<Option<String>> {
    let host = match authority(server) {
        Some(authority) => authority.rsplit_once('@').map_or(authority, |(_, host)| host),
        None => return Ok(None),
    };

    if host.is_empty() {
        return Ok(None);
    }

    validate_host(host).map_err(|source| NotaryError::InvalidServerUrl {
        server: server.to_string(),
        source,
    })?;

    debug!(?host, "Resolved notary host");

    Ok(Some(host.to_string()))
}

fn authority(server: &str) -> Option<&str> {
    let rest = server
        .find(|c: char| c == '#' || c == '?')
        .map_or(server, |end| &server[..end]);

    let rest = match scheme_len(rest) {
        Some(len) => &rest[len + 1..],
        None => rest,
    };

    let authority = rest.strip_prefix("//")?;
    Some(authority.find('/').map_or(authority, |end| &authority[..end]))
}

/// Length of a leading `scheme` (the part before `:`), if there is one.
fn scheme_len(server: &str) -> Option<usize> {
    let colon = server.find(':')?;
    let mut chars = server[..colon].chars();

    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    valid.then_some(colon)
}

/// Checks `host[:port]` without normalizing it. Ports only need to be
/// digits.
fn validate_host(host: &str) -> Result<(), url::ParseError> {
    let (name, port) = if host.starts_with('[') {
        let end = host.find(']').ok_or(url::ParseError::InvalidIpv6Address)?;
        let (name, rest) = host.split_at(end + 1);
        let port = match rest {
            "" => None,
            rest => Some(rest.strip_prefix(':').ok_or(url::ParseError::InvalidPort)?),
        };
        (name, port)
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) => (name, Some(port)),
            None => (host, None),
        }
    };

    if port.is_some_and(|port| !port.bytes().all(|b| b.is_ascii_digit())) {
        return Err(url::ParseError::InvalidPort);
    }

    if !name.is_empty() {
        Host::parse(name)?;
    }

    Ok(())
}
