//! Destination repository URLs
//!
//! Registry hosts embed the artifact type: `{team}-{type}.pkg.{domain}` or
//! `{team}-{type}.{domain}`. The open API lives on `{team}.{domain}`.

use crate::error::{MigrateError, Result};
use crate::kind::PathLayout;
use url::Url;

/// A parsed destination repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Repository URL without trailing slash
    base: String,
    scheme: String,
    /// Registry host (with port, if any)
    registry_host: String,
    /// Open API host (with port, if any)
    api_host: String,
    pub project: String,
    pub repository: String,
}

impl Destination {
    /// Parse a destination URL for an artifact type
    pub fn parse(dst: &str, type_name: &str, layout: PathLayout) -> Result<Self> {
        let trimmed = dst.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| MigrateError::invalid_destination(dst, e.to_string()))?;

        let host = url
            .host_str()
            .ok_or_else(|| MigrateError::invalid_destination(dst, "missing host"))?;
        let registry_host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let segments: Vec<&str> = url.path().trim_matches('/').split('/').collect();
        let (project, repository) = match (layout, segments.as_slice()) {
            (PathLayout::Nested, [_, project, repository]) => (*project, *repository),
            (PathLayout::Nested, _) => {
                return Err(MigrateError::invalid_destination(
                    dst,
                    "path must match /repository/{project}/{repository}",
                ))
            }
            (PathLayout::Direct, [project, repository]) => (*project, *repository),
            (PathLayout::Direct, _) => {
                return Err(MigrateError::invalid_destination(
                    dst,
                    "path must match /{project}/{repository}",
                ))
            }
        };
        if project.is_empty() || repository.is_empty() {
            return Err(MigrateError::invalid_destination(dst, "empty project or repository"));
        }

        Ok(Self {
            base: trimmed.to_string(),
            scheme: url.scheme().to_string(),
            api_host: api_host(&registry_host, type_name),
            registry_host,
            project: project.to_string(),
            repository: repository.to_string(),
        })
    }

    /// Registry host the destination URL points at
    pub fn registry_host(&self) -> &str {
        &self.registry_host
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// `{scheme}://{api host}/open-api`
    pub fn open_api_url(&self) -> String {
        format!("{}://{}/open-api", self.scheme, self.api_host)
    }

    /// Repository URL with a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}/", self.base)
    }

    /// Repository URL without trailing slash
    pub fn repository_url(&self) -> &str {
        &self.base
    }

    /// URL of a file below the repository
    pub fn upload_url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

/// Strip the `.pkg.` label and the `-{type}` suffix from a registry host
pub fn api_host(registry_host: &str, type_name: &str) -> String {
    registry_host
        .replace(".pkg.", ".")
        .replace(&format!("-{}", type_name), "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maven_destination() {
        let dst = Destination::parse(
            "https://demo-maven.pkg.coding.net/repository/test-project/dst-repo/",
            "maven",
            PathLayout::Nested,
        )
        .unwrap();
        assert_eq!(dst.project, "test-project");
        assert_eq!(dst.repository, "dst-repo");
        assert_eq!(dst.registry_host(), "demo-maven.pkg.coding.net");
        assert_eq!(dst.open_api_url(), "https://demo.coding.net/open-api");
        assert_eq!(
            dst.upload_url("org/acme/lib/1.0/lib-1.0.jar"),
            "https://demo-maven.pkg.coding.net/repository/test-project/dst-repo/org/acme/lib/1.0/lib-1.0.jar"
        );
    }

    #[test]
    fn test_parse_direct_destination() {
        let dst = Destination::parse("https://demo-generic.example.com/proj/files", "generic", PathLayout::Direct).unwrap();
        assert_eq!(dst.project, "proj");
        assert_eq!(dst.repository, "files");
        assert_eq!(dst.api_host(), "demo.example.com");
        assert_eq!(dst.base_url(), "https://demo-generic.example.com/proj/files/");
    }

    #[test]
    fn test_port_is_kept() {
        let dst = Destination::parse("http://127.0.0.1:8080/repository/p/r", "maven", PathLayout::Nested).unwrap();
        assert_eq!(dst.open_api_url(), "http://127.0.0.1:8080/open-api");
    }

    #[test]
    fn test_layout_mismatch() {
        assert!(Destination::parse("https://x-maven.pkg.d.net/p/r", "maven", PathLayout::Nested).is_err());
        assert!(Destination::parse("https://x-pypi.pkg.d.net/repository/p/r", "pypi", PathLayout::Direct).is_err());
        assert!(Destination::parse("not a url", "pypi", PathLayout::Direct).is_err());
    }
}
