//! Slack Web API client implementing [`ChatPlatform`].

use crate::engine::DesiredMembership;
use crate::error::{Result, SyncError};
use crate::provider::ChatPlatform;
use crate::types::{Channel, ChatUser, Group};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://slack.com/api";

const PAGE_LIMIT: &str = "200";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    needed: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize, Default)]
struct Profile {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: Profile,
}

#[derive(Deserialize)]
struct UsersPage {
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct SlackUserGroup {
    id: String,
    name: String,
    handle: String,
    #[serde(default)]
    users: Vec<String>,
}

#[derive(Deserialize)]
struct UserGroups {
    usergroups: Vec<SlackUserGroup>,
}

#[derive(Deserialize, Default)]
struct Topic {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct SlackChannel {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    topic: Topic,
}

#[derive(Deserialize)]
struct ChannelsPage {
    channels: Vec<SlackChannel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Deserialize)]
struct ChannelInfo {
    channel: SlackChannel,
}

#[derive(Deserialize)]
struct JoinResult {
    #[serde(default)]
    warning: Option<String>,
}

// ---------------------------------------------------------------------------
// SlackClient
// ---------------------------------------------------------------------------

pub struct SlackClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn get(&self, method: &str, query: &[(&str, &str)]) -> RequestBuilder {
        self.http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .query(query)
    }

    fn post(&self, method: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.token)
            .form(form)
    }

    /// Send a Web API request and decode its payload. Slack reports most
    /// failures as `200 OK` with `"ok": false`.
    fn call<T: DeserializeOwned>(&self, method: &str, req: RequestBuilder) -> Result<T> {
        let resp = req.send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(SyncError::Api {
                api: "Slack",
                method: method.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        let envelope: Envelope = serde_json::from_str(&body)?;
        if !envelope.ok {
            let error = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            if error == "missing_scope" {
                return Err(SyncError::MissingPermission {
                    action: method.to_string(),
                    scope: envelope.needed.unwrap_or_default(),
                });
            }
            return Err(SyncError::Api {
                api: "Slack",
                method: method.to_string(),
                reason: error,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn user_groups(&self) -> Result<Vec<SlackUserGroup>> {
        let method = "usergroups.list";
        let groups: UserGroups = self.call(method, self.get(method, &[("include_users", "true")]))?;
        Ok(groups.usergroups)
    }
}

impl ChatPlatform for SlackClient {
    fn list_users(&self) -> Result<Vec<ChatUser>> {
        let method = "users.list";
        let mut users = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![("limit", PAGE_LIMIT)];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let page: UsersPage = self.call(method, self.get(method, &query))?;
            users.extend(
                page.members
                    .into_iter()
                    .filter(|u| !u.deleted && !u.is_bot)
                    .map(|u| ChatUser {
                        id: u.id,
                        name: u.name,
                        email: u.profile.email,
                    }),
            );
            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                return Ok(users);
            }
        }
    }

    fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self
            .user_groups()?
            .into_iter()
            .map(|g| Group {
                id: g.id,
                name: g.name,
                handle: g.handle,
            })
            .collect())
    }

    fn list_channels(&self) -> Result<Vec<Channel>> {
        let method = "conversations.list";
        let mut channels = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
                ("limit", PAGE_LIMIT),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let page: ChannelsPage = self.call(method, self.get(method, &query))?;
            channels.extend(page.channels.into_iter().map(|c| Channel {
                id: c.id,
                name: c.name,
            }));
            cursor = page.response_metadata.next_cursor;
            if cursor.is_empty() {
                return Ok(channels);
            }
        }
    }

    fn join_channel(&self, channel_id: &str) -> Result<bool> {
        let method = "conversations.join";
        let result: JoinResult = self.call(method, self.post(method, &[("channel", channel_id)]))?;
        Ok(result.warning.as_deref() != Some("already_in_channel"))
    }

    fn update_group_membership(&self, membership: &DesiredMembership) -> Result<()> {
        let current: BTreeMap<String, BTreeSet<String>> = self
            .user_groups()?
            .into_iter()
            .map(|g| (g.id, g.users.into_iter().collect()))
            .collect();

        let method = "usergroups.users.update";
        for change in membership.diff(&current) {
            tracing::info!(
                group = %change.group,
                added = ?change.added,
                removed = ?change.removed,
                "updating user group members"
            );
            let users = change.members.join(",");
            let req = self.post(
                method,
                &[("usergroup", change.group.id.as_str()), ("users", users.as_str())],
            );
            self.call::<serde_json::Value>(method, req)
                .map_err(|e| SyncError::Mutation {
                    action: format!("update members of user group {}", change.group.handle),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn update_channel_topic(&self, channel_id: &str, topic: &str) -> Result<()> {
        let mutation_err = |e: SyncError| SyncError::Mutation {
            action: format!("update topic of channel {channel_id}"),
            reason: e.to_string(),
        };

        let info: ChannelInfo = self
            .call("conversations.info", self.get("conversations.info", &[("channel", channel_id)]))
            .map_err(mutation_err)?;
        if info.channel.topic.value == topic {
            tracing::info!(channel_id, "topic is up to date");
            return Ok(());
        }

        tracing::info!(channel_id, topic, "setting topic");
        let method = "conversations.setTopic";
        self.call::<serde_json::Value>(
            method,
            self.post(method, &[("channel", channel_id), ("topic", topic)]),
        )
        .map_err(mutation_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
