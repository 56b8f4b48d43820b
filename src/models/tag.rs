//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{OwnerId, TagId};

/// A free-form label, unique by name per owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub owner_id: OwnerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(owner_id: OwnerId, name: impl Into<String>) -> Self {
        Self {
            id: TagId::new(),
            owner_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name)
    }
}
