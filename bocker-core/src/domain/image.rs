//! Container image domain types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// One entry of the `manifest.json` written by `docker save`
///
/// This is external data: unknown fields are ignored and `RepoTags` may be
/// `null` for untagged images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Config", default)]
    pub config: String,
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Option<Vec<String>>,
    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,
}

impl ManifestEntry {
    /// Path of the final layer archive inside the saved image
    pub fn last_layer(&self) -> Option<&str> {
        self.layers.last().map(String::as_str)
    }
}

/// `{namespace}/{repository}:{tag}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub namespace: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(
        namespace: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Registry host embedded in the namespace, if any
    ///
    /// `registry.example.com/team` yields `registry.example.com`; a plain
    /// Docker Hub namespace such as `bueti` yields `None`.
    pub fn registry(&self) -> Option<&str> {
        let first = self.namespace.split('/').next()?;
        let has_more = self.namespace.contains('/');
        if has_more && (first.contains('.') || first.contains(':') || first == "localhost") {
            Some(first)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.repository, self.tag)
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    /// Parses `namespace/repository:tag`; the namespace may itself contain
    /// slashes (e.g. a registry host with a port).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, tag) = match s.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !tag.is_empty() => (name, tag),
            _ => return Err(Error::missing(format!("image tag in '{}'", s))),
        };
        let (namespace, repository) = name
            .rsplit_once('/')
            .filter(|(ns, repo)| !ns.is_empty() && !repo.is_empty())
            .ok_or_else(|| Error::missing(format!("image namespace in '{}'", s)))?;

        Ok(Self::new(namespace, repository, tag))
    }
}
