//! Source database records and the properties written to their migrated pages.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::PropertyMapping;
use crate::contract::NotionApi;
use crate::error::ApiError;

/// The fields of a source record the migration needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub title: String,
    pub label: Option<String>,
    /// `None` when the creator is no longer a member of the workspace.
    pub creator_email: Option<String>,
}

impl SourceRecord {
    /// `None` if the record has no id.
    pub fn from_api(record: &Value, mapping: &PropertyMapping) -> Option<SourceRecord> {
        let id = record.get("id")?.as_str()?.to_string();
        let properties = record.get("properties");
        let property = |name: &str| properties.and_then(|p| p.get(name));

        let title = property(&mapping.source_title)
            .and_then(|p| p.get("title"))
            .and_then(Value::as_array)
            .map(|segments| {
                segments
                    .iter()
                    .filter_map(|s| s.get("plain_text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();
        let label = property(&mapping.source_label)
            .and_then(|p| p.get("select"))
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let creator_email = property(&mapping.source_creator)
            .and_then(|p| p.get("created_by"))
            .and_then(|c| c.get("person"))
            .and_then(|p| p.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(SourceRecord {
            id,
            title,
            label,
            creator_email,
        })
    }
}

/// Looks up the people record whose email property contains `email`.
/// Zero or several matches yield `None`.
pub async fn find_owner<A>(
    api: &A,
    people_database_id: &str,
    mapping: &PropertyMapping,
    email: &str,
) -> Result<Option<String>, ApiError>
where
    A: NotionApi + ?Sized,
{
    info!(email, "[OWNER] Searching owner");
    let filter = json!({
        "property": mapping.people_email,
        "rich_text": { "contains": email },
    });
    let results = api.query_records(people_database_id, Some(filter)).await?;
    match results.as_slice() {
        [only] => {
            let id = only.get("id").and_then(Value::as_str).map(str::to_string);
            info!(email, found = id.is_some(), "[OWNER] Owner found");
            Ok(id)
        }
        other => {
            warn!(email, matches = other.len(), "[OWNER] Owner not found");
            Ok(None)
        }
    }
}

/// Properties for the target page: title, label and, when known, owner and experts.
pub fn build_properties(
    record: &SourceRecord,
    owner_id: Option<&str>,
    mapping: &PropertyMapping,
) -> Value {
    let mut properties = Map::new();
    properties.insert(
        mapping.target_title.clone(),
        json!({ "title": [{ "text": { "content": record.title } }] }),
    );
    if let Some(label) = &record.label {
        properties.insert(
            mapping.target_label.clone(),
            json!({ "select": { "name": label } }),
        );
    }
    if let Some(owner_id) = owner_id {
        let relation = json!({ "relation": [{ "id": owner_id }] });
        properties.insert(mapping.target_owner.clone(), relation.clone());
        properties.insert(mapping.target_experts.clone(), relation);
    }
    Value::Object(properties)
}
