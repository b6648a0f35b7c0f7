use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;

use super::{Discussion, DiscussionNote, DiscussionServer, MergeRequestKey, ServerError};
use crate::position::ResolvedPosition;

const PER_PAGE: &str = "100";

/// `position` parameters of the discussion creation endpoint
#[derive(Debug, Serialize)]
struct PositionParams<'a> {
    position_type: &'static str,
    base_sha: &'a str,
    start_sha: &'a str,
    head_sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_line: Option<u32>,
}

impl<'a> From<&'a ResolvedPosition> for PositionParams<'a> {
    fn from(position: &'a ResolvedPosition) -> Self {
        Self {
            position_type: "text",
            base_sha: &position.refs.base_sha,
            start_sha: &position.refs.start_sha,
            head_sha: &position.refs.head_sha,
            old_path: position.old_path.as_deref(),
            new_path: position.new_path.as_deref(),
            old_line: position.old_line,
            new_line: position.new_line,
        }
    }
}

#[derive(Debug, Serialize)]
struct NewDiscussion<'a> {
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<PositionParams<'a>>,
}

#[derive(Debug, Serialize)]
struct NewNote<'a> {
    body: &'a str,
}

/// GitLab REST v4 client for merge request discussions
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl GitLabClient {
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self, ServerError> {
        let base_url =
            Url::parse(host).map_err(|e| ServerError::InvalidUrl(format!("{host}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ServerError::InvalidUrl(host.to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("mranchor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// `<host>/api/v4/projects/<project>/merge_requests/<iid>/<tail...>`
    ///
    /// The project is pushed as a single segment so `group/name` is encoded.
    fn endpoint(&self, mr: &MergeRequestKey, tail: &[&str]) -> Result<Url, ServerError> {
        let mut url = self.base_url.clone();
        let iid = mr.iid.to_string();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ServerError::InvalidUrl(self.base_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["api", "v4", "projects", mr.project.as_str()])
                .extend(["merge_requests", iid.as_str()])
                .extend(tail);
        }
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response, ServerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ServerError::Status {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl DiscussionServer for GitLabClient {
    async fn create_discussion(
        &self,
        mr: &MergeRequestKey,
        body: &str,
        position: Option<&ResolvedPosition>,
    ) -> Result<Discussion, ServerError> {
        let url = self.endpoint(mr, &["discussions"])?;
        let payload = NewDiscussion {
            body,
            position: position.map(PositionParams::from),
        };
        tracing::debug!(%url, anchored = payload.position.is_some(), "creating discussion");

        let response = self
            .http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn list_discussions(&self, mr: &MergeRequestKey) -> Result<Vec<Discussion>, ServerError> {
        let mut discussions = Vec::new();
        let mut page = "1".to_string();

        loop {
            let url = self.endpoint(mr, &["discussions"])?;
            let response = self
                .http
                .get(url)
                .header("PRIVATE-TOKEN", &self.token)
                .query(&[("per_page", PER_PAGE), ("page", page.as_str())])
                .send()
                .await?;
            let response = Self::check(response).await?;

            let next_page = response
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);

            let batch: Vec<Discussion> = response.json().await?;
            discussions.extend(batch);

            match next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(discussions)
    }

    async fn delete_note(&self, mr: &MergeRequestKey, note_id: u64) -> Result<(), ServerError> {
        let note_id = note_id.to_string();
        let url = self.endpoint(mr, &["notes", note_id.as_str()])?;
        let response = self
            .http
            .delete(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_note(
        &self,
        mr: &MergeRequestKey,
        discussion_id: &str,
        body: &str,
    ) -> Result<DiscussionNote, ServerError> {
        let url = self.endpoint(mr, &["discussions", discussion_id, "notes"])?;
        let response = self
            .http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&NewNote { body })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::FailureKind;
    use crate::position::DiffRefs;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn mr() -> MergeRequestKey {
        MergeRequestKey::new("42", 7)
    }

    fn position() -> ResolvedPosition {
        ResolvedPosition {
            old_path: None,
            old_line: None,
            new_path: Some("src/main.rs".to_string()),
            new_line: Some(12),
            ambiguous: false,
            refs: DiffRefs {
                base_sha: "base".to_string(),
                start_sha: "start".to_string(),
                head_sha: "head".to_string(),
            },
        }
    }

    fn discussion_json(id: &str, note_id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "individual_note": false,
            "notes": [{
                "id": note_id,
                "body": "text",
                "author": {"id": 1, "username": "root", "name": "Administrator"},
                "created_at": "2024-01-01T00:00:00Z"
            }]
        })
    }

    #[tokio::test]
    async fn test_create_discussion_sends_position() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/merge_requests/7/discussions"))
            .and(header("PRIVATE-TOKEN", "secret"))
            .and(body_json(json!({
                "body": "looks off",
                "position": {
                    "position_type": "text",
                    "base_sha": "base",
                    "start_sha": "start",
                    "head_sha": "head",
                    "new_path": "src/main.rs",
                    "new_line": 12
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(discussion_json("abc", 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        let discussion = client
            .create_discussion(&mr(), "looks off", Some(&position()))
            .await
            .unwrap();
        assert_eq!(discussion.id, "abc");
    }

    #[tokio::test]
    async fn test_create_discussion_without_position() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/merge_requests/7/discussions"))
            .and(body_json(json!({"body": "general remark"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(discussion_json("def", 2)))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        let discussion = client
            .create_discussion(&mr(), "general remark", None)
            .await
            .unwrap();
        assert_eq!(discussion.notes[0].id, 2);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "400 Bad request - Note {:line_code=>[\"can't be blank\"]}"
            })))
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        let err = client
            .create_discussion(&mr(), "x", Some(&position()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.kind(), FailureKind::BadRequest);
        assert!(err.to_string().contains("line_code"));
    }

    #[tokio::test]
    async fn test_list_discussions_follows_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v4/projects/42/merge_requests/7/discussions"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-next-page", "2")
                    .set_body_json(json!([discussion_json("a", 1), discussion_json("b", 2)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/42/merge_requests/7/discussions"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-next-page", "")
                    .set_body_json(json!([discussion_json("c", 3)])),
            )
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        let discussions = client.list_discussions(&mr()).await.unwrap();
        let ids: Vec<&str> = discussions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_note() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/v4/projects/42/merge_requests/7/notes/99"))
            .and(header("PRIVATE-TOKEN", "secret"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        client.delete_note(&mr(), 99).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_note_replies_to_discussion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/merge_requests/7/discussions/abc/notes"))
            .and(body_json(json!({"body": "agreed"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 5,
                "body": "agreed",
                "author": {"id": 1, "username": "root"},
                "created_at": "2024-01-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GitLabClient::new(&server.uri(), "secret").unwrap();
        let note = client.create_note(&mr(), "abc", "agreed").await.unwrap();
        assert_eq!(note.id, 5);
    }

    #[test]
    fn test_endpoint_encodes_project_path() {
        let client = GitLabClient::new("https://gitlab.example.com/", "t").unwrap();
        let url = client
            .endpoint(&MergeRequestKey::new("group/sub/proj", 3), &["discussions"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fsub%2Fproj/merge_requests/3/discussions"
        );
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            GitLabClient::new("not a url", "t"),
            Err(ServerError::InvalidUrl(_))
        ));
    }
}
