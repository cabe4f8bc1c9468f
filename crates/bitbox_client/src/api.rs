//! Thin typed wrapper over the Bitbox REST backend.
//!
//! Every call carries the cookie session. A call either returns the parsed
//! payload or a [`ClientError`] derived from the status code; nothing is retried.

use std::sync::Arc;

use bitbox_shared::{
    domain::{EvaluationTokenId, GroupId, MfaCodeId, ProjectId, PromotionId, StudentId},
    models::{
        GradedStudentPostModel, LoginUserPostModel, MfaCodePostModel, MinimalGroupStudents,
        NewGroupPostModel, NewProjectPostModel, NewPromotionPostModel, NewStudentPostModel,
        Project, ProjectGroup, ProjectGroups, Promotion, RegisterUserPostModel, Student,
        StudentGroupMarkDetails, UpdatedGroupMarkPutModel, UpdatedStudentPutModel,
    },
};
use reqwest::{
    cookie::{CookieStore, Jar},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{normalize_api_url, ClientSettings},
    error::ClientError,
};

/// Name of the cookie the backend stores the session JWT in.
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone, Copy)]
enum Expect {
    Exactly(StatusCode),
    AnySuccess,
}

impl Expect {
    fn matches(self, status: StatusCode) -> bool {
        match self {
            Expect::Exactly(expected) => status == expected,
            Expect::AnySuccess => status.is_success(),
        }
    }
}

struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
}

fn build_http_session(user_agent: &str) -> Result<HttpSession, ClientError> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .user_agent(user_agent)
        .build()
        .map_err(ClientError::HttpClient)?;
    Ok(HttpSession { client, jar })
}

pub struct ApiClient {
    base_url: Url,
    user_agent: String,
    session: RwLock<HttpSession>,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let normalized = normalize_api_url(&settings.api_url)?;
        let base_url = Url::parse(&normalized)
            .map_err(|err| ClientError::InvalidBaseUrl(format!("{normalized}: {err}")))?;
        let session = build_http_session(&settings.user_agent)?;
        Ok(Self {
            base_url,
            user_agent: settings.user_agent.clone(),
            session: RwLock::new(session),
        })
    }

    pub fn with_base_url(api_url: &str) -> Result<Self, ClientError> {
        Self::new(&ClientSettings {
            api_url: api_url.to_string(),
            ..ClientSettings::default()
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Drops every cookie held for the backend by starting a fresh cookie jar.
    pub async fn clear_session(&self) -> Result<(), ClientError> {
        let fresh = build_http_session(&self.user_agent)?;
        *self.session.write().await = fresh;
        debug!("cleared backend session cookies");
        Ok(())
    }

    pub async fn session_cookie(&self, name: &str) -> Option<String> {
        let header = {
            let guard = self.session.read().await;
            guard.jar.cookies(&self.base_url)?
        };
        let raw = header.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let client = self.session.read().await.client.clone();
        client.request(method, url)
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        method: &Method,
        url: &Url,
        expected: Expect,
    ) -> Result<Response, ClientError> {
        let path = url.path().to_string();
        let response = request.send().await.map_err(|source| {
            warn!(%method, %path, error = %source, "backend request failed");
            ClientError::Transport {
                path: path.clone(),
                source,
            }
        })?;

        let status = response.status();
        debug!(%method, %path, status = status.as_u16(), "backend responded");
        if expected.matches(status) {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized {
                method: method.to_string(),
                path,
            });
        }

        Err(ClientError::Status {
            method: method.to_string(),
            path,
            status: status.as_u16(),
        })
    }

    async fn fetch(
        &self,
        method: Method,
        url: Url,
        expected: Expect,
    ) -> Result<Response, ClientError> {
        let request = self.request(method.clone(), url.clone()).await;
        self.execute(request, &method, &url, expected).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        expected: Expect,
    ) -> Result<Response, ClientError> {
        let request = self.request(method.clone(), url.clone()).await.json(body);
        self.execute(request, &method, &url, expected).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let path = url.path().to_string();
        let response = self
            .fetch(Method::GET, url, Expect::Exactly(StatusCode::OK))
            .await?;
        decode(response, &path).await
    }

    async fn create<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        let path = url.path().to_string();
        let response = self
            .send_json(Method::POST, url, body, Expect::Exactly(StatusCode::CREATED))
            .await?;
        decode(response, &path).await
    }

    pub async fn list_promotions(&self) -> Result<Vec<Promotion>, ClientError> {
        self.get_json(self.endpoint(&["promotions", ""])?).await
    }

    pub async fn create_promotion(
        &self,
        body: &NewPromotionPostModel,
    ) -> Result<PromotionId, ClientError> {
        self.create(self.endpoint(&["promotions", ""])?, body).await
    }

    pub async fn get_promotion(&self, promotion_id: &PromotionId) -> Result<Promotion, ClientError> {
        self.get_json(self.endpoint(&["promotions", promotion_id.as_str()])?)
            .await
    }

    pub async fn list_students(
        &self,
        promotion_id: &PromotionId,
    ) -> Result<Vec<Student>, ClientError> {
        self.get_json(self.endpoint(&["students", "promotion", promotion_id.as_str()])?)
            .await
    }

    pub async fn create_student(
        &self,
        promotion_id: &PromotionId,
        body: &NewStudentPostModel,
    ) -> Result<StudentId, ClientError> {
        self.create(
            self.endpoint(&["students", "promotion", promotion_id.as_str()])?,
            body,
        )
        .await
    }

    pub async fn update_student(
        &self,
        student_id: &StudentId,
        body: &UpdatedStudentPutModel,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["students", student_id.as_str()])?;
        self.send_json(Method::PUT, url, body, Expect::Exactly(StatusCode::OK))
            .await?;
        Ok(())
    }

    pub async fn delete_student(&self, student_id: &StudentId) -> Result<(), ClientError> {
        let url = self.endpoint(&["students", student_id.as_str()])?;
        self.fetch(Method::DELETE, url, Expect::Exactly(StatusCode::OK))
            .await?;
        Ok(())
    }

    pub async fn list_projects(
        &self,
        promotion_id: &PromotionId,
    ) -> Result<Vec<Project>, ClientError> {
        self.get_json(self.endpoint(&["projects", "promotion", promotion_id.as_str()])?)
            .await
    }

    pub async fn create_project(
        &self,
        promotion_id: &PromotionId,
        body: &NewProjectPostModel,
    ) -> Result<ProjectId, ClientError> {
        self.create(
            self.endpoint(&["projects", "promotion", promotion_id.as_str()])?,
            body,
        )
        .await
    }

    pub async fn get_project(&self, project_id: &ProjectId) -> Result<Project, ClientError> {
        self.get_json(self.endpoint(&["projects", project_id.as_str()])?)
            .await
    }

    pub async fn list_groups(&self, project_id: &ProjectId) -> Result<Vec<ProjectGroup>, ClientError> {
        let payload: ProjectGroups = self
            .get_json(self.endpoint(&["groups", "project", project_id.as_str()])?)
            .await?;
        Ok(payload.groups)
    }

    pub async fn students_without_group(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Student>, ClientError> {
        self.get_json(self.endpoint(&["groups", "project", project_id.as_str(), "students"])?)
            .await
    }

    pub async fn create_group(
        &self,
        project_id: &ProjectId,
        body: &NewGroupPostModel,
    ) -> Result<GroupId, ClientError> {
        self.create(
            self.endpoint(&["groups", "project", project_id.as_str()])?,
            body,
        )
        .await
    }

    pub async fn assign_students(
        &self,
        group_id: &GroupId,
        student_ids: &[StudentId],
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["groups", group_id.as_str(), "students"])?;
        self.send_json(Method::POST, url, student_ids, Expect::Exactly(StatusCode::OK))
            .await?;
        Ok(())
    }

    pub async fn update_group_mark(&self, group_id: &GroupId, mark: f64) -> Result<(), ClientError> {
        let url = self.endpoint(&["groups", group_id.as_str()])?;
        self.send_json(
            Method::PUT,
            url,
            &UpdatedGroupMarkPutModel { mark },
            Expect::Exactly(StatusCode::OK),
        )
        .await?;
        Ok(())
    }

    pub async fn student_marks(
        &self,
        group_id: &GroupId,
        student_id: &StudentId,
    ) -> Result<StudentGroupMarkDetails, ClientError> {
        self.get_json(self.endpoint(&[
            "groups",
            group_id.as_str(),
            "student",
            student_id.as_str(),
        ])?)
        .await
    }

    /// Exchanges an evaluation token for a session cookie.
    pub async fn resolve_evaluation_token(
        &self,
        token_id: &EvaluationTokenId,
    ) -> Result<(), ClientError> {
        let mut url = self.endpoint(&["token", "evaluation"])?;
        url.query_pairs_mut().append_pair("id", token_id.as_str());
        self.fetch(Method::GET, url, Expect::Exactly(StatusCode::OK))
            .await?;
        Ok(())
    }

    pub async fn group_to_evaluate(&self) -> Result<MinimalGroupStudents, ClientError> {
        self.get_json(self.endpoint(&["marks", "group-to-evaluate"])?)
            .await
    }

    pub async fn submit_grades(
        &self,
        group_id: &GroupId,
        grades: &[GradedStudentPostModel],
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["marks", "evaluate", "group", group_id.as_str()])?;
        self.send_json(Method::POST, url, grades, Expect::Exactly(StatusCode::OK))
            .await?;
        info!(%group_id, grades = grades.len(), "submitted group evaluation");
        Ok(())
    }

    pub async fn login(&self, body: &LoginUserPostModel) -> Result<MfaCodeId, ClientError> {
        let url = self.endpoint(&["auth", "login"])?;
        let path = url.path().to_string();
        let response = self
            .send_json(Method::POST, url, body, Expect::Exactly(StatusCode::OK))
            .await?;
        decode(response, &path).await
    }

    pub async fn validate_mfa_code(
        &self,
        mfa_code_id: &MfaCodeId,
        body: &MfaCodePostModel,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["auth", "login", "code", mfa_code_id.as_str()])?;
        self.send_json(Method::POST, url, body, Expect::Exactly(StatusCode::OK))
            .await?;
        Ok(())
    }

    pub async fn register(&self, body: &RegisterUserPostModel) -> Result<(), ClientError> {
        let url = self.endpoint(&["auth", "register"])?;
        self.send_json(Method::POST, url, body, Expect::AnySuccess)
            .await?;
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["auth", "logout"])?;
        self.fetch(Method::POST, url, Expect::AnySuccess).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ClientError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport {
            path: path.to_string(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        warn!(%path, error = %err, "backend response did not match the expected shape");
        ClientError::UnexpectedResponse {
            path: path.to_string(),
            reason: err.to_string(),
        }
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
