use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::api::models::{MessageKind, MessageRecord};
use crate::error::{Error, Result};
use crate::utils::normalize_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteType {
    ForMe,
    ForEveryone,
}

impl DeleteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteType::ForMe => "for_me",
            DeleteType::ForEveryone => "for_everyone",
        }
    }
}

/// Outcome of the follow/block gate. The relationship endpoints themselves
/// are another service's concern; we only consume the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allowed,
    Blocked,
    NotFollowing,
}

pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_api(&normalize_url(base_url)),
            token: token.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }

    /// Full message history between the local user and `partner_id`.
    /// Ordering is the server's; callers sort before use.
    pub async fn history(&self, partner_id: &str) -> Result<Vec<MessageRecord>> {
        let endpoint = self.endpoint("v1/messages");
        let resp = self
            .with_auth(self.http.get(&endpoint).query(&[("partner", partner_id)]))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let items = extract_array(&json, &["messages", "data"]);
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    /// Create a message. Returns the canonical record when the server
    /// echoes one back; some deployments return only a bare 201.
    pub async fn send(
        &self,
        receiver_id: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Option<MessageRecord>> {
        let endpoint = self.endpoint("v1/messages");
        let body = serde_json::json!({
            "receiverId": receiver_id,
            "content": content,
            "messageType": kind.as_str(),
        });
        let resp = self
            .with_auth(self.http.post(&endpoint).json(&body))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = match resp.json().await {
            Ok(json) => json,
            Err(_) => return Ok(None),
        };
        let record = json
            .get("message")
            .or_else(|| json.get("data"))
            .cloned()
            .unwrap_or(json);
        Ok(serde_json::from_value::<MessageRecord>(record)
            .ok()
            .filter(|r| r.id.is_some()))
    }

    pub async fn delete(&self, message_id: &str, delete_type: DeleteType) -> Result<()> {
        let endpoint = self.endpoint("v1/messages/delete");
        let body = serde_json::json!({
            "messageId": message_id,
            "deleteType": delete_type.as_str(),
        });
        let resp = self
            .with_auth(self.http.post(&endpoint).json(&body))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    /// Persist the read state for every message from `partner_id`.
    pub async fn mark_read(&self, partner_id: &str) -> Result<()> {
        let endpoint = self.endpoint("v1/messages/read");
        let body = serde_json::json!({ "partnerId": partner_id });
        let resp = self
            .with_auth(self.http.post(&endpoint).json(&body))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        Ok(())
    }

    /// Whether messaging `partner_id` is permitted (block/follow state).
    pub async fn can_message(&self, partner_id: &str) -> Result<Permission> {
        let endpoint = self.endpoint("v1/relationship");
        let resp = self
            .with_auth(self.http.get(&endpoint).query(&[("partner", partner_id)]))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let blocked = json.get("blocked").and_then(|v| v.as_bool()).unwrap_or(false);
        let following = json
            .get("following")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(if blocked {
            Permission::Blocked
        } else if !following {
            Permission::NotFollowing
        } else {
            Permission::Allowed
        })
    }
}

fn base_api(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{}/api", trimmed)
    }
}

/// The server wraps list responses inconsistently; accept a bare array or
/// any of the known envelope keys.
fn extract_array(json: &Value, keys: &[&str]) -> Vec<Value> {
    if let Some(arr) = json.as_array() {
        return arr.clone();
    }
    for key in keys {
        if let Some(arr) = json.get(key).and_then(|v| v.as_array()) {
            return arr.clone();
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_api_is_idempotent() {
        assert_eq!(base_api("https://x.example"), "https://x.example/api");
        assert_eq!(base_api("https://x.example/api/"), "https://x.example/api");
    }

    #[test]
    fn extract_array_unwraps_envelopes() {
        let bare = serde_json::json!([1, 2]);
        assert_eq!(extract_array(&bare, &["data"]).len(), 2);
        let wrapped = serde_json::json!({"messages": [1]});
        assert_eq!(extract_array(&wrapped, &["messages", "data"]).len(), 1);
        let neither = serde_json::json!({"ok": true});
        assert!(extract_array(&neither, &["data"]).is_empty());
    }
}
