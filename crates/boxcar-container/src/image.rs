use crate::error::{ContainerError, ContainerResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TAG: &str = "latest";

/// A container image reference: `[registry/]repository[:tag]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository name, e.g. `boxcar-cifar10` or `team/boxcar-cifar10`.
    pub name: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Registry host, e.g. `123456789012.dkr.ecr.us-west-2.amazonaws.com`.
    #[serde(default)]
    pub registry: Option<String>,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl ImageRef {
    pub fn new(name: impl Into<String>) -> ContainerResult<Self> {
        let name = name.into();
        validate_component("repository", &name)?;
        Ok(Self { name, tag: default_tag(), registry: None })
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> ContainerResult<Self> {
        let tag = tag.into();
        validate_component("tag", &tag)?;
        if tag.contains('/') || tag.contains(':') {
            return Err(ContainerError::InvalidImageRef(format!("tag must not contain '/' or ':': {tag}")));
        }
        self.tag = tag;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> ContainerResult<Self> {
        let registry = registry.into();
        validate_component("registry", &registry)?;
        self.registry = Some(registry.trim_end_matches('/').to_string());
        Ok(self)
    }

    /// Parse `[registry/]name[:tag]`. The first path component counts as a
    /// registry when it looks like a host (contains `.` or `:`, or is `localhost`).
    pub fn parse(reference: &str) -> ContainerResult<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ContainerError::InvalidImageRef("empty image reference".to_string()));
        }

        let (registry, rest) = match reference.split_once('/') {
            Some((first, rest)) if first.contains('.') || first.contains(':') || first == "localhost" => {
                (Some(first), rest)
            }
            _ => (None, reference),
        };

        let (name, tag) = match rest.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => (name, Some(tag)),
            _ => (rest, None),
        };

        let mut image = Self::new(name)?;
        if let Some(tag) = tag {
            image = image.with_tag(tag)?;
        }
        if let Some(registry) = registry {
            image = image.with_registry(registry)?;
        }
        Ok(image)
    }

    /// `name:tag`, the reference used for local builds.
    #[must_use]
    pub fn local(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// `<registry>/<repository>:<tag>`, the reference pushed to the registry.
    pub fn remote(&self) -> ContainerResult<String> {
        let registry = self.registry.as_deref().ok_or_else(|| {
            ContainerError::InvalidImageRef(format!("no registry configured for {}", self.local()))
        })?;
        Ok(format!("{registry}/{}", self.local()))
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.registry {
            Some(registry) => write!(f, "{registry}/{}:{}", self.name, self.tag),
            None => write!(f, "{}:{}", self.name, self.tag),
        }
    }
}

impl std::str::FromStr for ImageRef {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_component(what: &str, value: &str) -> ContainerResult<()> {
    if value.trim().is_empty() {
        return Err(ContainerError::InvalidImageRef(format!("{what} must not be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ContainerError::InvalidImageRef(format!("{what} must not contain whitespace: {value}")));
    }
    Ok(())
}
