//! Product descriptors
//!
//! Every product directory carries a markup descriptor (`description.xml`,
//! required) and may carry a data descriptor (`description.json`). The two
//! are merged into one [`Product`]: a non-empty data-form field wins over the
//! markup-form value, and a name mismatch between the two is fatal.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{BuildDetails, Env, Product, ProductType};
use crate::error::{InstallerError, Result};

pub const MARKUP_DESCRIPTOR: &str = "description.xml";
pub const DATA_DESCRIPTOR: &str = "description.json";

/// Fields read from `description.xml`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupDescriptor {
    pub name: String,
    pub version: String,
    pub build: String,
    pub date: String,
    pub product_type: Option<ProductType>,
    pub parents: Vec<String>,
    pub categories: Vec<String>,
    pub doc: Vec<String>,
}

/// `build` is either a plain build string or a nested record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildField {
    Text(String),
    Details(BuildDetails),
}

/// Data-interchange form of a product, as found in `description.json` and
/// in every lock manifest entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_details: Option<BuildDetails>,
}

/// Parse the markup form. `origin` names the source in error messages.
pub fn parse_markup(text: &str, origin: &str) -> Result<MarkupDescriptor> {
    let document =
        roxmltree::Document::parse(text).map_err(|e| InstallerError::DescriptorParseFailed {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

    let root = document.root_element();
    if root.tag_name().name() != "product" {
        return Err(InstallerError::DescriptorParseFailed {
            path: origin.to_string(),
            reason: format!("root element is <{}>, expected <product>", root.tag_name().name()),
        });
    }

    let name = root
        .attribute("name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| InstallerError::DescriptorMissingName {
            path: origin.to_string(),
        })?;

    let product_type = root
        .attribute("type")
        .filter(|t| !t.trim().is_empty())
        .map(|t| parse_type(t, origin))
        .transpose()?;

    let named_children = |container: &str, item: &str| -> Vec<String> {
        root.children()
            .filter(|n| n.has_tag_name(container))
            .flat_map(|n| n.children().filter(move |c| c.has_tag_name(item)))
            .filter_map(|n| n.attribute("name"))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    };

    Ok(MarkupDescriptor {
        name: name.to_string(),
        version: attribute_or_empty(root, "version"),
        build: attribute_or_empty(root, "build"),
        date: attribute_or_empty(root, "date"),
        product_type,
        parents: named_children("parents", "parent"),
        categories: named_children("categories", "category"),
        doc: split_doc(root.attribute("doc").unwrap_or_default()),
    })
}

fn attribute_or_empty(node: roxmltree::Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or_default().trim().to_string()
}

/// Parse the data form, requiring a non-empty name.
pub fn parse_data(text: &str, origin: &str) -> Result<DataDescriptor> {
    let data: DataDescriptor =
        serde_json::from_str(text).map_err(|e| InstallerError::DescriptorParseFailed {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

    if data.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        return Err(InstallerError::DescriptorMissingName {
            path: origin.to_string(),
        });
    }

    Ok(data)
}

/// Merge both descriptor forms into one product.
///
/// Data-form values win when non-empty. `env`, `license`, `display` and the
/// build details only exist in the data form.
pub fn merge(markup: MarkupDescriptor, data: Option<DataDescriptor>) -> Result<Product> {
    let Some(data) = data else {
        let mut product = Product::new(markup.name);
        product.version = markup.version;
        product.build = markup.build;
        product.date = markup.date;
        product.product_type = markup.product_type.unwrap_or_default();
        product.parents = markup.parents;
        product.categories = markup.categories;
        product.doc = markup.doc;
        return Ok(product);
    };

    let data_name = data.name.clone().unwrap_or_default();
    if data_name.trim() != markup.name {
        return Err(InstallerError::DescriptorNameMismatch {
            markup: markup.name,
            data: data_name,
        });
    }

    let (data_build, mut build_details) = match data.build {
        Some(BuildField::Text(text)) => (Some(text), None),
        Some(BuildField::Details(details)) => (details.timestamp.clone(), Some(details)),
        None => (None, None),
    };
    let mut nested_build = build_details.is_some();
    if data.build_details.is_some() {
        build_details = data.build_details;
        nested_build = false;
    }

    let product_type = match data.product_type.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(t) => parse_type(t, &markup.name)?,
        None => markup.product_type.unwrap_or_default(),
    };

    let env = match data.env.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(e) => e
            .parse::<Env>()
            .map_err(|reason| InstallerError::DescriptorParseFailed {
                path: markup.name.clone(),
                reason,
            })?,
        None => Env::default(),
    };

    let mut product = Product::new(markup.name);
    product.version = prefer_text(data.version, markup.version);
    product.build = prefer_text(data_build, markup.build);
    product.date = prefer_text(data.date, markup.date);
    product.product_type = product_type;
    product.parents = prefer_list(data.parents, markup.parents);
    product.categories = prefer_list(data.categories, markup.categories);
    product.doc = prefer_list(data.doc.as_deref().map(split_doc), markup.doc);
    product.env = env;
    product.license = data.license.filter(|l| !l.is_empty());
    product.display = data.display;
    product.build_details = build_details;
    product.nested_build = nested_build;
    Ok(product)
}

/// Load and merge the descriptors found in a product directory
pub fn load_product(dir: &Path) -> Result<Product> {
    let markup_path = dir.join(MARKUP_DESCRIPTOR);
    if !markup_path.is_file() {
        return Err(InstallerError::DescriptorNotFound {
            path: dir.display().to_string(),
        });
    }

    let origin = markup_path.display().to_string();
    let markup = parse_markup(&read(&markup_path)?, &origin)?;

    let data_path = dir.join(DATA_DESCRIPTOR);
    let data = if data_path.is_file() {
        Some(parse_data(
            &read(&data_path)?,
            &data_path.display().to_string(),
        )?)
    } else {
        None
    };

    let mut product = merge(markup, data)?;
    product.dirname = Some(dir.to_path_buf());
    Ok(product)
}

/// Whether `dir` looks like a product directory
pub fn has_descriptor(dir: &Path) -> bool {
    dir.join(MARKUP_DESCRIPTOR).is_file()
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| InstallerError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn parse_type(value: &str, origin: &str) -> Result<ProductType> {
    value
        .parse()
        .map_err(|reason| InstallerError::DescriptorParseFailed {
            path: origin.to_string(),
            reason,
        })
}

fn split_doc(doc: &str) -> Vec<String> {
    doc.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

fn prefer_text(data: Option<String>, markup: String) -> String {
    data.filter(|v| !v.trim().is_empty()).unwrap_or(markup)
}

fn prefer_list(data: Option<Vec<String>>, markup: Vec<String>) -> Vec<String> {
    data.filter(|v| !v.is_empty()).unwrap_or(markup)
}

impl Product {
    /// Data-form serialization of this product
    pub fn to_data(&self) -> DataDescriptor {
        let (build, build_details) = match &self.build_details {
            Some(details) if self.nested_build => (BuildField::Details(details.clone()), None),
            details => (BuildField::Text(self.build.clone()), details.clone()),
        };

        DataDescriptor {
            name: Some(self.name().to_string()),
            version: Some(self.version.clone()),
            build: Some(build),
            date: Some(self.date.clone()),
            product_type: Some(self.product_type.as_str().to_string()),
            parents: Some(self.parents.clone()),
            categories: Some(self.categories.clone()),
            doc: Some(self.doc.join(", ")),
            env: Some(self.env.as_str().to_string()),
            license: self.license.clone(),
            display: self.display.clone(),
            build_details,
        }
    }
}

impl DataDescriptor {
    /// Rebuild a product from a data-form record alone
    pub fn into_product(self) -> Result<Product> {
        let name = self.name.clone().unwrap_or_default();
        if name.trim().is_empty() {
            return Err(InstallerError::DescriptorMissingName {
                path: "lock manifest entry".to_string(),
            });
        }
        merge(
            MarkupDescriptor {
                name: name.trim().to_string(),
                ..MarkupDescriptor::default()
            },
            Some(self),
        )
    }
}
