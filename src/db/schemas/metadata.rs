//! Common metadata for all documents
//!
//! Creation and update timestamps. For user records the creation timestamp
//! doubles as the account creation instant the streak fallback counts from.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    /// When the document was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// When the document was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Metadata {
    /// Create new metadata with current timestamps
    pub fn new() -> Self {
        let now = DateTime::now();
        Self {
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}
