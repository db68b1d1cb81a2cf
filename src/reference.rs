//! Repository and reference parsing
//!
//! Turns user supplied strings such as `busybox`, `quay.io/coreos/etcd:v3.5`,
//! `localhost:5000/team/app@sha256:...` or `https://registry.example.com/app`
//! into the index (registry host) and repository names the protocol clients need.

use crate::error::{RegistryError, Result};
use serde::Serialize;
use url::Url;

/// Name of the default (official) Docker index
pub const DEFAULT_INDEX_NAME: &str = "docker.io";
/// Tag used when a reference names neither a tag nor a digest
pub const DEFAULT_TAG: &str = "latest";
/// Endpoint of the official v1 index
pub const DEFAULT_V1_INDEX_URL: &str = "https://index.docker.io";
/// Endpoint of the official v2 registry
pub const DEFAULT_V2_REGISTRY: &str = "https://registry-1.docker.io";

const OFFICIAL_INDEX_ALIASES: [&str; 2] = ["docker.io", "index.docker.io"];

/// A registry host, optionally with an explicit scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub official: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl IndexInfo {
    /// Scheme used when the index was given without one
    pub fn effective_scheme(&self) -> &str {
        match &self.scheme {
            Some(scheme) => scheme,
            None if self.is_loopback() => "http",
            None => "https",
        }
    }

    fn is_loopback(&self) -> bool {
        let host = self.name.split(':').next().unwrap_or_default();
        host == "localhost" || host == "127.0.0.1"
    }

    /// Base URL of the v1 index API
    pub fn v1_url(&self) -> Result<Url> {
        if self.official {
            return Ok(Url::parse(DEFAULT_V1_INDEX_URL)?);
        }
        Ok(Url::parse(&format!(
            "{}://{}",
            self.effective_scheme(),
            self.name
        ))?)
    }

    /// Base URL of the v2 distribution API
    pub fn v2_url(&self) -> Result<Url> {
        if self.official {
            return Ok(Url::parse(DEFAULT_V2_REGISTRY)?);
        }
        Ok(Url::parse(&format!(
            "{}://{}",
            self.effective_scheme(),
            self.name
        ))?)
    }
}

/// A repository on a given index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub index: IndexInfo,
    /// Name used on the wire, e.g. `library/busybox`
    pub remote_name: String,
    /// Short name as users type it, e.g. `busybox` or `quay.io/coreos/etcd`
    pub local_name: String,
    /// Fully qualified name, e.g. `docker.io/library/busybox`
    pub canonical_name: String,
    pub official: bool,
}

/// A repository plus the tag or digest that was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoAndRef {
    #[serde(flatten)]
    pub repo: RepoInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl RepoAndRef {
    /// The digest when present, otherwise the tag
    pub fn reference(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }
}

fn split_scheme(arg: &str) -> Result<(Option<&str>, &str)> {
    match arg.split_once("://") {
        Some((scheme @ ("http" | "https"), rest)) => Ok((Some(scheme), rest)),
        Some((scheme, _)) => Err(RegistryError::Validation(format!(
            "invalid index scheme '{}' in '{}': must be http or https",
            scheme, arg
        ))),
        None => Ok((None, arg)),
    }
}

/// Parse an index (registry host) name.
///
/// `None` yields the official Docker index.
pub fn parse_index(arg: Option<&str>) -> Result<IndexInfo> {
    let Some(arg) = arg else {
        return Ok(IndexInfo {
            name: DEFAULT_INDEX_NAME.to_string(),
            official: true,
            scheme: None,
        });
    };

    let (scheme, rest) = split_scheme(arg)?;
    let name = rest.trim_end_matches('/');

    if name.is_empty() {
        return Err(RegistryError::Validation(format!(
            "invalid index '{}': empty name",
            arg
        )));
    }
    if name.contains('/') {
        return Err(RegistryError::Validation(format!(
            "invalid index '{}': index name must not contain a path",
            arg
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'))
    {
        return Err(RegistryError::Validation(format!(
            "invalid index '{}': contains invalid characters",
            arg
        )));
    }

    if OFFICIAL_INDEX_ALIASES.contains(&name) {
        return Ok(IndexInfo {
            name: DEFAULT_INDEX_NAME.to_string(),
            official: true,
            scheme: scheme.map(str::to_string),
        });
    }

    Ok(IndexInfo {
        name: name.to_string(),
        official: false,
        scheme: scheme.map(str::to_string),
    })
}

fn looks_like_index(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_remote_name(remote_name: &str, arg: &str) -> Result<()> {
    let valid_chars = remote_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '/' | '.' | '-'));

    if remote_name.is_empty()
        || !valid_chars
        || remote_name.starts_with('/')
        || remote_name.ends_with('/')
        || remote_name.contains("//")
    {
        return Err(RegistryError::Validation(format!(
            "invalid repository name '{}': must match [a-z0-9_/.-]+ with non-empty path components",
            arg
        )));
    }
    Ok(())
}

/// Parse a repository name, without tag or digest.
///
/// `default_index` is used when the name does not start with a host; it
/// defaults to the official Docker index.
pub fn parse_repo(arg: &str, default_index: Option<&str>) -> Result<RepoInfo> {
    let (scheme, rest) = split_scheme(arg)?;

    let (index, remote) = match (scheme, rest.split_once('/')) {
        (Some(scheme), Some((host, remote))) => {
            (parse_index(Some(format!("{}://{}", scheme, host).as_str()))?, remote)
        }
        (Some(_), None) => {
            return Err(RegistryError::Validation(format!(
                "invalid repository '{}': missing repository path after index",
                arg
            )));
        }
        (None, Some((host, remote))) if looks_like_index(host) => {
            (parse_index(Some(host))?, remote)
        }
        (None, _) => (parse_index(default_index)?, rest),
    };

    let remote_name = if index.official && !remote.contains('/') {
        format!("library/{}", remote)
    } else {
        remote.to_string()
    };
    validate_remote_name(&remote_name, arg)?;

    let (local_name, official) = if index.official {
        let short = remote_name
            .strip_prefix("library/")
            .unwrap_or(&remote_name)
            .to_string();
        let official = remote_name.starts_with("library/");
        (short, official)
    } else {
        (format!("{}/{}", index.name, remote_name), false)
    };
    let canonical_name = format!("{}/{}", index.name, remote_name);

    Ok(RepoInfo {
        index,
        remote_name,
        local_name,
        canonical_name,
        official,
    })
}

fn validate_tag(tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !first_ok || !rest_ok || tag.len() > 128 {
        return Err(RegistryError::Validation(format!(
            "invalid tag '{}': must match [A-Za-z0-9_][A-Za-z0-9_.-]{{0,127}}",
            tag
        )));
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<()> {
    let Some((algorithm, encoded)) = digest.split_once(':') else {
        return Err(RegistryError::Validation(format!(
            "invalid digest '{}': expected <algorithm>:<hex>",
            digest
        )));
    };

    if algorithm.is_empty()
        || !algorithm
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '_' | '-'))
    {
        return Err(RegistryError::Validation(format!(
            "invalid digest algorithm in '{}'",
            digest
        )));
    }

    let bytes = hex::decode(encoded).map_err(|e| {
        RegistryError::Validation(format!("invalid digest '{}': {}", digest, e))
    })?;
    if bytes.is_empty() || (algorithm == "sha256" && bytes.len() != 32) {
        return Err(RegistryError::Validation(format!(
            "invalid digest '{}': unexpected length for {}",
            digest, algorithm
        )));
    }
    Ok(())
}

/// Parse a repository with an optional `:tag` or `@digest` suffix.
///
/// When neither is given the tag defaults to [`DEFAULT_TAG`].
pub fn parse_repo_and_ref(arg: &str, default_index: Option<&str>) -> Result<RepoAndRef> {
    let (name, tag, digest) = if let Some((name, digest)) = arg.split_once('@') {
        validate_digest(digest)?;
        (name, None, Some(digest.to_string()))
    } else {
        let last_slash = arg.rfind('/');
        match arg.rfind(':') {
            Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
                let tag = &arg[colon + 1..];
                validate_tag(tag)?;
                (&arg[..colon], Some(tag.to_string()), None)
            }
            _ => (arg, Some(DEFAULT_TAG.to_string()), None),
        }
    };

    Ok(RepoAndRef {
        repo: parse_repo(name, default_index)?,
        tag,
        digest,
    })
}

/// Parse a repository with an optional `:tag` suffix. Digests are rejected,
/// use [`parse_repo_and_ref`] for those.
pub fn parse_repo_and_tag(arg: &str, default_index: Option<&str>) -> Result<RepoAndRef> {
    if arg.contains('@') {
        return Err(RegistryError::Validation(format!(
            "invalid repository '{}': digest references need parse_repo_and_ref",
            arg
        )));
    }
    parse_repo_and_ref(arg, default_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str =
        "sha256:2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";

    #[test]
    fn default_index_is_official() {
        let index = parse_index(None).unwrap();
        assert_eq!(index.name, "docker.io");
        assert!(index.official);
        assert_eq!(index.v1_url().unwrap().as_str(), "https://index.docker.io/");
        assert_eq!(
            index.v2_url().unwrap().as_str(),
            "https://registry-1.docker.io/"
        );
    }

    #[test]
    fn index_aliases_and_schemes() {
        assert!(parse_index(Some("index.docker.io")).unwrap().official);

        let index = parse_index(Some("http://registry.local:5000/")).unwrap();
        assert_eq!(index.name, "registry.local:5000");
        assert_eq!(index.scheme.as_deref(), Some("http"));
        assert_eq!(
            index.v2_url().unwrap().as_str(),
            "http://registry.local:5000/"
        );

        let index = parse_index(Some("quay.io")).unwrap();
        assert_eq!(index.v1_url().unwrap().as_str(), "https://quay.io/");

        let index = parse_index(Some("localhost:5000")).unwrap();
        assert_eq!(index.effective_scheme(), "http");
    }

    #[test]
    fn rejects_bad_indexes() {
        assert!(parse_index(Some("")).is_err());
        assert!(parse_index(Some("ftp://example.com")).is_err());
        assert!(parse_index(Some("example.com/path")).is_err());
        assert!(parse_index(Some("exa mple.com")).is_err());
    }

    #[test]
    fn official_short_names() {
        let repo = parse_repo("busybox", None).unwrap();
        assert_eq!(repo.remote_name, "library/busybox");
        assert_eq!(repo.local_name, "busybox");
        assert_eq!(repo.canonical_name, "docker.io/library/busybox");
        assert!(repo.official);

        let repo = parse_repo("joshwilsdon/nodejs", None).unwrap();
        assert_eq!(repo.remote_name, "joshwilsdon/nodejs");
        assert_eq!(repo.local_name, "joshwilsdon/nodejs");
        assert!(!repo.official);
        assert!(repo.index.official);
    }

    #[test]
    fn names_with_hosts() {
        let repo = parse_repo("quay.io/quay/elasticsearch", None).unwrap();
        assert_eq!(repo.index.name, "quay.io");
        assert_eq!(repo.remote_name, "quay/elasticsearch");
        assert_eq!(repo.local_name, "quay.io/quay/elasticsearch");

        let repo = parse_repo("localhost/app", None).unwrap();
        assert_eq!(repo.index.name, "localhost");

        let repo = parse_repo("https://registry.example.com/team/app", None).unwrap();
        assert_eq!(repo.index.scheme.as_deref(), Some("https"));
        assert_eq!(repo.remote_name, "team/app");
    }

    #[test]
    fn default_index_override() {
        let repo = parse_repo("team/app", Some("registry.example.com")).unwrap();
        assert_eq!(repo.index.name, "registry.example.com");
        assert_eq!(repo.remote_name, "team/app");
    }

    #[test]
    fn rejects_bad_repo_names() {
        assert!(parse_repo("BusyBox", None).is_err());
        assert!(parse_repo("quay.io/", None).is_err());
        assert!(parse_repo("a//b", None).is_err());
        assert!(parse_repo("https://registry.example.com", None).is_err());
    }

    #[test]
    fn tags_and_digests() {
        let parsed = parse_repo_and_ref("alpine", None).unwrap();
        assert_eq!(parsed.tag.as_deref(), Some("latest"));
        assert_eq!(parsed.reference(), "latest");

        let parsed = parse_repo_and_ref("localhost:5000/team/app:v1.2", None).unwrap();
        assert_eq!(parsed.repo.index.name, "localhost:5000");
        assert_eq!(parsed.repo.remote_name, "team/app");
        assert_eq!(parsed.tag.as_deref(), Some("v1.2"));

        let parsed = parse_repo_and_ref(&format!("busybox@{}", DIGEST), None).unwrap();
        assert_eq!(parsed.tag, None);
        assert_eq!(parsed.digest.as_deref(), Some(DIGEST));
        assert_eq!(parsed.reference(), DIGEST);
    }

    #[test]
    fn rejects_bad_references() {
        assert!(parse_repo_and_ref("busybox:", None).is_err());
        assert!(parse_repo_and_ref("busybox:-bad", None).is_err());
        assert!(parse_repo_and_ref("busybox@sha256:abc", None).is_err());
        assert!(parse_repo_and_ref("busybox@sha256:zz", None).is_err());
        assert!(parse_repo_and_ref("busybox@nocolon", None).is_err());
    }

    #[test]
    fn tag_parser_refuses_digests() {
        assert!(parse_repo_and_tag("busybox:1.36", None).is_ok());
        assert!(parse_repo_and_tag(&format!("busybox@{}", DIGEST), None).is_err());
    }
}
