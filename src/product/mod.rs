//! Product records
//!
//! A [`Product`] is one deployable unit: a name, a version, the parent
//! products it depends on and the metadata carried by its descriptors.
//! Products are built by merging the two on-disk descriptor forms (see
//! [`descriptor`]) or created as name-only stubs while their source is
//! still being fetched.

pub mod collection;
pub mod descriptor;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use collection::ProductCollection;

/// Kind of product, ordered from most to least specific.
///
/// The derived `Ord` is the placement precedence: a customer product wins
/// over a site product, which wins over a solution, which wins over a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Customer,
    Site,
    #[default]
    Solution,
    Framework,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::Customer => "customer",
            ProductType::Site => "site",
            ProductType::Solution => "solution",
            ProductType::Framework => "framework",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(ProductType::Customer),
            "site" => Ok(ProductType::Site),
            "solution" => Ok(ProductType::Solution),
            "framework" => Ok(ProductType::Framework),
            other => Err(format!(
                "unknown product type '{other}' (expected solution, framework, customer or site)"
            )),
        }
    }
}

/// Deployment environment a product build targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Dev,
    Prod,
}

impl Env {
    pub fn as_str(self) -> &'static str {
        match self {
            Env::Dev => "dev",
            Env::Prod => "prod",
        }
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Env::Dev),
            "prod" => Ok(Env::Prod),
            other => Err(format!("unknown env '{other}' (expected dev or prod)")),
        }
    }
}

/// Structured build information from the data-form descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// A named, versioned deployable unit with declared parent dependencies
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    name: String,
    pub version: String,
    pub build: String,
    pub date: String,
    pub product_type: ProductType,
    pub parents: Vec<String>,
    pub categories: Vec<String>,
    pub doc: Vec<String>,
    pub env: Env,
    pub license: Option<String>,
    pub display: Option<serde_json::Value>,
    pub build_details: Option<BuildDetails>,
    /// `build` arrived as the nested record rather than a plain string
    pub nested_build: bool,
    /// Explicit branch override; when unset the branch derives from `version`
    pub branch: Option<String>,
    /// Directory the product was fetched into
    pub dirname: Option<PathBuf>,
    pub provider_used: Option<String>,
    pub branch_used: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            build: String::new(),
            date: String::new(),
            product_type: ProductType::default(),
            parents: Vec::new(),
            categories: Vec::new(),
            doc: Vec::new(),
            env: Env::default(),
            license: None,
            display: None,
            build_details: None,
            nested_build: false,
            branch: None,
            dirname: None,
            provider_used: None,
            branch_used: None,
        }
    }

    /// Name-only product waiting to be fetched
    pub fn stub(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut product = Self::new(name);
        product.version = version.into();
        product
    }

    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branch to fetch: the explicit override, else the one derived from the version
    pub fn resolved_branch(&self) -> Option<String> {
        self.branch
            .clone()
            .filter(|b| !b.is_empty())
            .or_else(|| version_to_branch(&self.version))
    }
}

/// Map a product version onto the branch that holds it.
///
/// `dev` and `master` are branches already; `X-dev` lives on
/// `release-X-dev` and any other `X` on `release-X`.
pub fn version_to_branch(version: &str) -> Option<String> {
    let version = version.trim();
    match version {
        "" => None,
        "dev" | "master" => Some(version.to_string()),
        v => Some(format!("release-{v}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_to_branch() {
        assert_eq!(version_to_branch("dev").as_deref(), Some("dev"));
        assert_eq!(version_to_branch("master").as_deref(), Some("master"));
        assert_eq!(version_to_branch("2025.03").as_deref(), Some("release-2025.03"));
        assert_eq!(
            version_to_branch("2025.03-dev").as_deref(),
            Some("release-2025.03-dev")
        );
        assert_eq!(version_to_branch(""), None);
    }

    #[test]
    fn test_resolved_branch_prefers_override() {
        let mut product = Product::stub("kbot", "2025.03");
        assert_eq!(product.resolved_branch().as_deref(), Some("release-2025.03"));

        product.branch = Some("feature-x".to_string());
        assert_eq!(product.resolved_branch().as_deref(), Some("feature-x"));
    }

    #[test]
    fn test_product_type_parse_and_precedence() {
        assert_eq!("Framework".parse::<ProductType>(), Ok(ProductType::Framework));
        assert!("plugin".parse::<ProductType>().is_err());
        assert!(ProductType::Customer < ProductType::Site);
        assert!(ProductType::Solution < ProductType::Framework);
    }

    #[test]
    fn test_env_defaults_to_dev() {
        assert_eq!(Env::default(), Env::Dev);
        assert_eq!("PROD".parse::<Env>(), Ok(Env::Prod));
    }
}
