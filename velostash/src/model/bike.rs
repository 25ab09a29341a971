use serde::{Deserialize, Serialize};

fn default_category() -> String {
    "Other".to_string()
}

/// A listing posted by a user. The `id` is the creation time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    pub id: i64,
    /// Email of the owning user. Weak reference: the user may be gone.
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    /// Mirror of the first entry of `image_urls`, kept for older readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Bike {
    pub fn has_images(&self) -> bool {
        self.image_urls.iter().any(|url| !url.is_empty())
            || self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    pub fn listed_at(&self) -> i64 {
        self.id
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner.eq_ignore_ascii_case(email.trim())
    }

    /// Replaces the images and keeps the legacy single-image field in sync.
    pub fn set_images(&mut self, urls: Vec<String>) {
        self.image_url = urls.first().cloned();
        self.image_urls = urls;
    }
}
