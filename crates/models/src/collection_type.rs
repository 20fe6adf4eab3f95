use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// The entity collections kept by the storefront admin, one remote bin each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Products,
    Categories,
    Customers,
}

impl CollectionType {
    pub const ALL: [CollectionType; 3] = [
        CollectionType::Products,
        CollectionType::Categories,
        CollectionType::Customers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Products => "products",
            CollectionType::Categories => "categories",
            CollectionType::Customers => "customers",
        }
    }

    /// Key of the local cache entry mirroring this collection, e.g. `adminProducts`.
    pub fn cache_key(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("admin{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "admin".to_string(),
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(CollectionType::Products),
            "categories" => Ok(CollectionType::Categories),
            "customers" => Ok(CollectionType::Customers),
            other => Err(ModelError::UnknownCollection(other.to_string())),
        }
    }
}
