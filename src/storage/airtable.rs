//! Airtable storage implementation.
//!
//! Uses the REST API (`/v0/{base}/{table}`): listing follows the `offset`
//! cursor until exhausted, and each record is created with its own request.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AirtableConfig, ArticleRecord, FieldMap};
use crate::storage::{RecordStore, StoredRecord};

/// Airtable-backed record store.
pub struct AirtableStore {
    client: Client,
    records_url: Url,
    token: String,
    fields: FieldMap,
    use_field_ids: bool,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<ApiRecord>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl AirtableStore {
    /// Create a store for the configured table using `token`.
    pub fn new(client: Client, config: &AirtableConfig, token: impl Into<String>) -> Result<Self> {
        let records_url = Url::parse(&format!(
            "{}/{}/{}",
            config.api_url.trim_end_matches('/'),
            config.base_id,
            config.table
        ))?;

        Ok(Self {
            client,
            records_url,
            token: token.into(),
            fields: config.fields.clone(),
            use_field_ids: config.use_field_ids,
            page_size: config.page_size,
        })
    }

    /// Create a store reading the token from `config.token_env`.
    pub fn from_env(client: Client, config: &AirtableConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::MissingCredential(config.token_env.clone()))?;
        Self::new(client, config, token)
    }

    fn list_query(&self, offset: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("pageSize", self.page_size.to_string()),
            ("fields[]", self.fields.url.clone()),
        ];
        if self.use_field_ids {
            query.push(("returnFieldsByFieldId", "true".to_string()));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }

    fn to_stored(&self, record: ApiRecord) -> StoredRecord {
        let url = record
            .fields
            .get(&self.fields.url)
            .and_then(Value::as_str)
            .map(str::to_string);
        StoredRecord {
            id: Some(record.id),
            url,
        }
    }

    /// Turn non-success responses into `AppError::Store`.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::store(status.as_u16(), error_message(&body)))
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn list(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let response = self
                .client
                .get(self.records_url.clone())
                .bearer_auth(&self.token)
                .query(&self.list_query(offset.as_deref()))
                .send()
                .await?;
            let page: ListResponse = Self::check(response).await?.json().await?;

            log::debug!("Airtable list page: {} records", page.records.len());
            records.extend(page.records.into_iter().map(|r| self.to_stored(r)));

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    async fn create(&self, record: &ArticleRecord) -> Result<()> {
        let body = json!({
            "fields": record_fields(&self.fields, record),
            "typecast": true,
        });

        let response = self
            .client
            .post(self.records_url.clone())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Map a record onto table columns. Empty optional fields are omitted.
pub fn record_fields(map: &FieldMap, record: &ArticleRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(map.title.clone(), Value::from(record.title.as_str()));
    fields.insert(map.url.clone(), Value::from(record.url.as_str()));
    fields.insert(map.category.clone(), Value::from(record.category.as_str()));

    let optional = [
        (&map.image_url, record.image_url.clone()),
        (&map.summary, record.summary.clone()),
        (&map.author, record.author.clone()),
        (&map.publication_date, record.iso_date()),
    ];
    for (key, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fields.insert(key.clone(), Value::from(value));
        }
    }

    fields
}

/// Best-effort message from an Airtable error body.
///
/// Errors come as `{"error": {"type": .., "message": ..}}` or
/// `{"error": "NOT_FOUND"}`.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    match json.get("error") {
        Some(Value::String(kind)) => kind.clone(),
        Some(Value::Object(err)) => {
            let kind = err.get("type").and_then(Value::as_str).unwrap_or("ERROR");
            match err.get("message").and_then(Value::as_str) {
                Some(message) => format!("{kind}: {message}"),
                None => kind.to_string(),
            }
        }
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CanonicalUrl;
    use chrono::NaiveDate;

    fn config() -> AirtableConfig {
        AirtableConfig {
            base_id: "appBase".into(),
            table: "tblArticles".into(),
            ..AirtableConfig::default()
        }
    }

    fn store(config: &AirtableConfig) -> AirtableStore {
        AirtableStore::new(Client::new(), config, "token").unwrap()
    }

    fn record() -> ArticleRecord {
        ArticleRecord {
            title: "Pricing Power".into(),
            url: CanonicalUrl::from("https://knowledge.insead.edu/strategy/pricing-power"),
            image_url: None,
            category: "Strategy".into(),
            summary: Some("Why firms hold prices.".into()),
            author: Some(String::new()),
            publication_date: NaiveDate::from_ymd_opt(2025, 6, 2),
        }
    }

    #[test]
    fn test_records_url() {
        let store = store(&config());
        assert_eq!(
            store.records_url.as_str(),
            "https://api.airtable.com/v0/appBase/tblArticles"
        );
    }

    #[test]
    fn test_record_fields_by_name() {
        let fields = record_fields(&FieldMap::default(), &record());

        assert_eq!(fields["Title"], "Pricing Power");
        assert_eq!(
            fields["Article URL"],
            "https://knowledge.insead.edu/strategy/pricing-power"
        );
        assert_eq!(fields["Category"], "Strategy");
        assert_eq!(fields["Summary"], "Why firms hold prices.");
        assert_eq!(fields["Publication Date"], "2025-06-02");
        assert!(!fields.contains_key("Image URL"));
        assert!(!fields.contains_key("Author"));
    }

    #[test]
    fn test_record_fields_by_id() {
        let map = FieldMap {
            title: "fldTitle".into(),
            url: "fldUrl".into(),
            ..FieldMap::default()
        };
        let fields = record_fields(&map, &record());
        assert_eq!(fields["fldTitle"], "Pricing Power");
        assert!(fields.contains_key("fldUrl"));
    }

    #[test]
    fn test_list_query_with_field_ids_and_offset() {
        let mut config = config();
        config.use_field_ids = true;
        config.fields.url = "fldUrl".into();
        let query = store(&config).list_query(Some("itr123"));

        assert!(query.contains(&("fields[]", "fldUrl".to_string())));
        assert!(query.contains(&("returnFieldsByFieldId", "true".to_string())));
        assert!(query.contains(&("offset", "itr123".to_string())));
    }

    #[test]
    fn test_list_response_to_stored() {
        let json = r#"{
            "records": [
                {"id": "rec1", "fields": {"Article URL": "https://x.com/a/?ref=1"}},
                {"id": "rec2", "fields": {}}
            ],
            "offset": "itr1"
        }"#;
        let page: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.offset.as_deref(), Some("itr1"));

        let store = store(&config());
        let stored: Vec<_> = page.records.into_iter().map(|r| store.to_stored(r)).collect();
        assert_eq!(stored[0].url.as_deref(), Some("https://x.com/a/?ref=1"));
        assert_eq!(stored[1].id.as_deref(), Some("rec2"));
        assert!(stored[1].url.is_none());
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"type":"INVALID_PERMISSIONS","message":"No access"}}"#),
            "INVALID_PERMISSIONS: No access"
        );
        assert_eq!(error_message(r#"{"error":"NOT_FOUND"}"#), "NOT_FOUND");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_from_env_missing_token() {
        let mut config = config();
        config.token_env = "HARVESTER_TEST_TOKEN_THAT_IS_NEVER_SET".into();
        assert!(matches!(
            AirtableStore::from_env(Client::new(), &config),
            Err(AppError::MissingCredential(var)) if var == "HARVESTER_TEST_TOKEN_THAT_IS_NEVER_SET"
        ));
    }
}
