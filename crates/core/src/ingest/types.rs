use serde::{Deserialize, Serialize};

/// Provider-neutral news article. Missing text fields are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
}
