// ABOUTME: Inbound push notification payload, as sent by Docker Hub webhooks.
// ABOUTME: Only callback_url, push_data.tag and repository.repo_name are required.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body of a push webhook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookRequest {
    pub callback_url: String,
    pub push_data: PushData,
    pub repository: Repository,
}

impl HookRequest {
    /// `repository:tag` as pushed.
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository.repo_name, self.push_data.tag)
    }
}

/// Details of this specific push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushData {
    pub tag: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub pushed_at: i64,
    #[serde(default)]
    pub pusher: String,
}

impl PushData {
    pub fn pushed_at(&self) -> Option<DateTime<Utc>> {
        if self.pushed_at == 0 {
            return None;
        }
        DateTime::from_timestamp(self.pushed_at, 0)
    }
}

/// Repository metadata. Informational apart from `repo_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub repo_name: String,
    pub comment_count: i64,
    pub date_created: i64,
    pub description: String,
    pub dockerfile: String,
    pub full_description: String,
    pub is_official: bool,
    pub is_private: bool,
    pub is_trusted: bool,
    pub name: String,
    pub namespace: String,
    pub owner: String,
    pub repo_url: String,
    pub star_count: i64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOCKER_HUB_SAMPLE: &str = r#"{
  "callback_url": "https://registry.hub.docker.com/u/svendowideit/testhook/hook/2141b5bi5i5b02bec211i4eeih0242eg11000a/",
  "push_data": {
    "images": ["27d47432a69bca5f2700e4dff7de0388ed65f9d3fb1ec645e2bc24c223dc1cc3"],
    "pushed_at": 1417566161,
    "pusher": "trustedbuilder",
    "tag": "latest"
  },
  "repository": {
    "comment_count": 0,
    "date_created": 1417494799,
    "description": "",
    "dockerfile": "FROM busybox\n",
    "full_description": "Docker Hub based automated build from a GitHub repo",
    "is_official": false,
    "is_private": true,
    "is_trusted": true,
    "name": "testhook",
    "namespace": "svendowideit",
    "owner": "svendowideit",
    "repo_name": "svendowideit/testhook",
    "repo_url": "https://registry.hub.docker.com/u/svendowideit/testhook/",
    "star_count": 0,
    "status": "Active"
  }
}"#;

    #[test]
    fn parses_docker_hub_payload() {
        let hook: HookRequest = serde_json::from_str(DOCKER_HUB_SAMPLE).unwrap();
        assert_eq!(hook.image(), "svendowideit/testhook:latest");
        assert_eq!(hook.push_data.pusher, "trustedbuilder");
        assert!(hook.repository.is_private);
        assert_eq!(
            hook.push_data.pushed_at().map(|t| t.to_rfc3339()),
            Some("2014-12-03T00:22:41+00:00".to_string())
        );
    }

    #[test]
    fn informational_fields_are_optional() {
        let hook: HookRequest = serde_json::from_value(json!({
            "callback_url": "http://cb/done",
            "push_data": { "tag": "v2" },
            "repository": { "repo_name": "acme/app" }
        }))
        .unwrap();
        assert_eq!(hook.image(), "acme/app:v2");
        assert_eq!(hook.push_data.pushed_at(), None);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let no_callback = json!({
            "push_data": { "tag": "v2" },
            "repository": { "repo_name": "a" }
        });
        assert!(serde_json::from_value::<HookRequest>(no_callback).is_err());

        let no_tag = json!({
            "callback_url": "x",
            "push_data": {},
            "repository": { "repo_name": "a" }
        });
        assert!(serde_json::from_value::<HookRequest>(no_tag).is_err());
    }
}
