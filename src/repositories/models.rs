use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of the bundle index; serde is confined to this module tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub(crate) name: String,
    /// URL template with a single `{}` placeholder for the version tag.
    pub(crate) url: String,
    #[serde(rename = "parameters", default)]
    pub(crate) other_parameters: Option<HashMap<String, String>>,
}

impl Repository {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Look up a single extra parameter, ignoring blank values.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.other_parameters
            .as_ref()?
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}
