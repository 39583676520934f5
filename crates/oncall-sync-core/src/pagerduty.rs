//! PagerDuty REST API v2 client implementing [`ScheduleProvider`].

use crate::error::{Result, SyncError};
use crate::provider::ScheduleProvider;
use crate::types::{ProviderSchedule, ProviderUser, ScheduleRef};
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.pagerduty.com";

const ACCEPT: &str = "application/vnd.pagerduty+json;version=2";
const PAGE_LIMIT: usize = 100;

#[derive(Deserialize)]
struct ScheduleEnvelope {
    schedule: ProviderSchedule,
}

#[derive(Deserialize)]
struct ScheduleList {
    schedules: Vec<ProviderSchedule>,
    #[serde(default)]
    more: bool,
}

#[derive(Deserialize)]
struct UserList {
    users: Vec<ProviderUser>,
}

pub struct PagerDutyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl PagerDutyClient {
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

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Token token={}", self.token))
            .header("Accept", ACCEPT)
            .query(query)
            .send()?;
        Ok(resp)
    }

    fn decode<T: DeserializeOwned>(resp: Response, method: &str) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SyncError::Api {
                api: "PagerDuty",
                method: method.to_string(),
                reason: format!("{status}: {body}"),
            });
        }
        Ok(resp.json()?)
    }

    fn schedule_by_id(&self, id: &str) -> Result<Option<ProviderSchedule>> {
        let resp = self.get(&format!("/schedules/{id}"), &[])?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: ScheduleEnvelope = Self::decode(resp, "GET /schedules/{id}")?;
        Ok(Some(envelope.schedule))
    }

    /// The schedules endpoint only supports fuzzy search, so page through the
    /// results until one matches the name exactly.
    fn schedule_by_name(&self, name: &str) -> Result<Option<ProviderSchedule>> {
        let mut offset = 0;
        loop {
            let resp = self.get(
                "/schedules",
                &[
                    ("query", name.to_string()),
                    ("limit", PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                ],
            )?;
            let page: ScheduleList = Self::decode(resp, "GET /schedules")?;
            let count = page.schedules.len();
            if let Some(found) = page.schedules.into_iter().find(|s| s.name == name) {
                return Ok(Some(found));
            }
            if !page.more || count == 0 {
                return Ok(None);
            }
            offset += count;
        }
    }
}

impl ScheduleProvider for PagerDutyClient {
    fn get_schedule(&self, schedule: &ScheduleRef) -> Result<Option<ProviderSchedule>> {
        match schedule {
            ScheduleRef::Id(id) => self.schedule_by_id(id),
            ScheduleRef::Name(name) => self.schedule_by_name(name),
        }
    }

    fn get_on_call_user(&self, schedule: &ProviderSchedule) -> Result<ProviderUser> {
        let since = Utc::now();
        let until = since + ChronoDuration::seconds(1);
        let resp = self.get(
            &format!("/schedules/{}/users", schedule.id),
            &[
                ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ],
        )?;
        let list: UserList = Self::decode(resp, "GET /schedules/{id}/users")?;
        let user = list.users.into_iter().next().ok_or_else(|| SyncError::OnCallLookup {
            schedule: schedule.name.clone(),
            reason: "nobody is on call".to_string(),
        })?;
        tracing::debug!(schedule = %schedule, user = %user, "found on-call user");
        Ok(user)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> PagerDutyClient {
        PagerDutyClient::with_base_url("secret", server.url()).unwrap()
    }

    #[test]
    fn schedule_by_id() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/schedules/P1")
            .match_header("authorization", "Token token=secret")
            .match_header("accept", ACCEPT)
            .with_header("content-type", "application/json")
            .with_body(r#"{"schedule": {"id": "P1", "name": "Primary", "time_zone": "UTC"}}"#)
            .create();

        let found = client(&server)
            .get_schedule(&ScheduleRef::Id("P1".into()))
            .unwrap();
        mock.assert();
        assert_eq!(
            found,
            Some(ProviderSchedule {
                id: "P1".into(),
                name: "Primary".into()
            })
        );
    }

    #[test]
    fn schedule_by_id_not_found() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/schedules/P404")
            .with_status(404)
            .with_body(r#"{"error": {"message": "Not Found", "code": 2100}}"#)
            .create();
        let found = client(&server)
            .get_schedule(&ScheduleRef::Id("P404".into()))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn schedule_by_name_pages_until_exact_match() {
        let mut server = mockito::Server::new();
        let first = server
            .mock("GET", "/schedules")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "Primary".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"schedules": [{"id": "P7", "name": "Primary EU"}], "more": true}"#)
            .create();
        let second = server
            .mock("GET", "/schedules")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "Primary".into()),
                Matcher::UrlEncoded("offset".into(), "1".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(r#"{"schedules": [{"id": "P1", "name": "Primary"}], "more": false}"#)
            .create();

        let found = client(&server)
            .get_schedule(&ScheduleRef::Name("Primary".into()))
            .unwrap();
        first.assert();
        second.assert();
        assert_eq!(found.map(|s| s.id), Some("P1".to_string()));
    }

    #[test]
    fn schedule_by_name_without_match() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/schedules")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"schedules": [{"id": "P7", "name": "Primary EU"}], "more": false}"#)
            .create();
        let found = client(&server)
            .get_schedule(&ScheduleRef::Name("Primary".into()))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn on_call_user_is_first_listed() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/schedules/P1/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::Regex("since=".into()),
                Matcher::Regex("until=".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"users": [
                    {"id": "PU1", "name": "Alice", "email": "alice@example.com", "type": "user"},
                    {"id": "PU2", "name": "Bob", "email": "bob@example.com", "type": "user"}
                ]}"#,
            )
            .create();

        let schedule = ProviderSchedule {
            id: "P1".into(),
            name: "Primary".into(),
        };
        let user = client(&server).get_on_call_user(&schedule).unwrap();
        assert_eq!(user.email, "alice@example.com");
    }

    #[test]
    fn empty_on_call_list_is_a_lookup_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/schedules/P1/users")
            .match_query(Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": []}"#)
            .create();
        let schedule = ProviderSchedule {
            id: "P1".into(),
            name: "Primary".into(),
        };
        let err = client(&server).get_on_call_user(&schedule).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Lookup);
    }

    #[test]
    fn server_error_is_reported_with_status() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/schedules/P1")
            .with_status(500)
            .with_body("upstream failure")
            .create();
        let err = client(&server)
            .get_schedule(&ScheduleRef::Id("P1".into()))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("upstream failure"), "{msg}");
    }
}
