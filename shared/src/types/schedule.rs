use serde::{Deserialize, Deserializer, Serialize};

/// A calendar entry. `date` is a naive calendar day, `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub date: String,
    pub hyperlink_url: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub hyperlink_url: String,
}

/// Partial update. An absent `content` keeps the stored value (`None`);
/// `null` or `""` clears it (`Some(None)` or `Some(Some(""))`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub hyperlink_url: Option<String>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleList {
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleEnvelope {
    pub schedule: Schedule,
}
