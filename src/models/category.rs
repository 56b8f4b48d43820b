//! Category model
//!
//! Categories are per-owner labels for expenses. Every owner has one reserved
//! "Default" category that cannot be renamed or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CategoryId, OwnerId};

/// Name of the reserved per-owner category
pub const DEFAULT_CATEGORY_NAME: &str = "Default";
/// Color given to the reserved category
pub const DEFAULT_CATEGORY_COLOR: &str = "#000000";
/// Icon given to the reserved category
pub const DEFAULT_CATEGORY_ICON: &str = "fa-flutter";

/// An expense category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// Owning user
    pub owner_id: OwnerId,

    /// Display name, unique per owner
    pub name: String,

    /// Display color, e.g. "#ff8800"
    #[serde(default)]
    pub color: String,

    /// Icon identifier
    #[serde(default)]
    pub icon_name: String,

    /// When the category was created
    pub created_at: DateTime<Utc>,

    /// When the category was last modified
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category
    pub fn new(
        owner_id: OwnerId,
        name: impl Into<String>,
        color: impl Into<String>,
        icon_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            owner_id,
            name: name.into(),
            color: color.into(),
            icon_name: icon_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The reserved category for `owner_id`
    pub fn default_for(owner_id: OwnerId) -> Self {
        Self::new(
            owner_id,
            DEFAULT_CATEGORY_NAME,
            DEFAULT_CATEGORY_COLOR,
            DEFAULT_CATEGORY_ICON,
        )
    }

    /// Whether this is the owner's reserved category
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_CATEGORY_NAME
    }

    /// Validate the category
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::EmptyName);
        }

        if self.name.len() > 50 {
            return Err(CategoryValidationError::NameTooLong(self.name.len()));
        }

        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Validation errors for categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyName,
    NameTooLong(usize),
}

impl fmt::Display for CategoryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Category name cannot be empty"),
            Self::NameTooLong(len) => {
                write!(f, "Category name too long ({} chars, max 50)", len)
            }
        }
    }
}

impl std::error::Error for CategoryValidationError {}
