use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const BUILTIN_MENU: &str = include_str!("../../menu/default_menu.toml");

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DietaryTag {
    Vegetarian,
    Vegan,
    Spicy,
    Other(String),
}

impl DietaryTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::Spicy => "spicy",
            Self::Other(tag) => tag,
        }
    }

    pub fn badge(&self) -> String {
        match self {
            Self::Vegetarian => "🌱 Veg".to_string(),
            Self::Vegan => "🌿 Vegan".to_string(),
            Self::Spicy => "🌶️ Spicy".to_string(),
            Self::Other(tag) => tag.clone(),
        }
    }
}

impl From<String> for DietaryTag {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "vegetarian" => Self::Vegetarian,
            "vegan" => Self::Vegan,
            "spicy" => Self::Spicy,
            _ => Self::Other(value),
        }
    }
}

impl From<DietaryTag> for String {
    fn from(value: DietaryTag) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: ItemId,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    #[serde(default)]
    pub upsell: Vec<ItemId>,
    #[serde(default)]
    pub dietary: Vec<DietaryTag>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub name: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub items: Vec<String>,
    pub discount: Decimal,
}

/// Static menu configuration as it is written on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuDocument {
    #[serde(default)]
    pub categories: Vec<MenuCategory>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
    /// Units on hand per item id, consumed by the static inventory.
    #[serde(default)]
    pub stock: BTreeMap<String, u32>,
}

#[derive(Debug, Error)]
pub enum MenuLoadError {
    #[error("could not read menu file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse menu document: {0}")]
    Parse(#[from] toml::de::Error),
}

impl MenuDocument {
    pub fn builtin() -> Result<Self, MenuLoadError> {
        Self::from_toml_str(BUILTIN_MENU)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, MenuLoadError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, MenuLoadError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| MenuLoadError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    /// Loads `path` when given, otherwise the built-in house menu.
    pub fn load(path: Option<&Path>) -> Result<Self, MenuLoadError> {
        let document = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::builtin()?,
        };
        info!(
            event_name = "core.menu.loaded",
            source = %path.map(|path| path.display().to_string()).unwrap_or_else(|| "builtin".to_string()),
            categories = document.categories.len(),
            promotions = document.promotions.len(),
            "menu document loaded"
        );
        Ok(document)
    }
}
