use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Jira timestamps look like `2024-03-01T09:15:00.000+0000`, which is not
/// quite RFC 3339.
fn jira_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(&raw)
        .or_else(|_| DateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCategory {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

/// Well-known issue fields; anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Named>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuetype: Option<Named>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<User>,
    #[serde(
        default,
        deserialize_with = "jira_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<FixedOffset>>,
    #[serde(
        default,
        deserialize_with = "jira_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "self", default)]
    pub self_url: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(rename = "renderedFields", default, skip_serializing_if = "Option::is_none")]
    pub rendered_fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<Value>>,
}

impl Ticket {
    pub fn status_name(&self) -> &str {
        self.fields
            .status
            .as_ref()
            .map(|status| status.name.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOperation {
    Add(String),
    Remove(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelUpdates {
    pub labels: Vec<LabelOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelUpdateRequest {
    pub update: LabelUpdates,
}

impl LabelUpdateRequest {
    pub fn new(add: &[String], remove: &[String]) -> Self {
        let labels = add
            .iter()
            .cloned()
            .map(LabelOperation::Add)
            .chain(remove.iter().cloned().map(LabelOperation::Remove))
            .collect();
        Self {
            update: LabelUpdates { labels },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionId {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRequest {
    pub transition: TransitionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_request_matches_the_jira_shape() {
        let request = LabelUpdateRequest::new(&["urgent".to_string()], &["stale".to_string()]);
        assert_eq!(
            serde_json::to_value(&request).expect("json"),
            serde_json::json!({"update": {"labels": [{"add": "urgent"}, {"remove": "stale"}]}})
        );
    }

    #[test]
    fn ticket_keeps_unknown_fields() {
        let raw = r#"{
            "id": "10001",
            "key": "PROJ-1",
            "self": "https://acme.atlassian.net/rest/api/3/issue/10001",
            "fields": {
                "summary": "Broken login",
                "status": {"id": "3", "name": "In Progress"},
                "created": "2024-03-01T09:15:00.000+0000",
                "customfield_10010": 5
            }
        }"#;
        let ticket: Ticket = serde_json::from_str(raw).expect("ticket");
        assert_eq!(ticket.status_name(), "In Progress");
        assert!(ticket.fields.created.is_some());
        assert_eq!(ticket.fields.extra["customfield_10010"], 5);
    }
}
