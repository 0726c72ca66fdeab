use serde::{Deserialize, Serialize};

/// A bookmark on the quick-link board, as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLink {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub order_index: i64,
    pub icon_url: Option<String>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuickLinkData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Partial update; absent or empty fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuickLinkData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub id: i64,
    pub order_index: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderData {
    pub updates: Vec<OrderUpdate>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLinkList {
    pub quick_links: Vec<QuickLink>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLinkEnvelope {
    pub quick_link: QuickLink,
}
