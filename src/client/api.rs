use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::client::cache::Snapshot;
use crate::client::{ClientError, Session, TodoCache};
use crate::engine::TodoStats;
use crate::models::dto::{
    AuthResponse, CreateTodoRequest, ListTodosQuery, LoginRequest, RegisterRequest, UpdateTodoRequest,
};
use crate::models::todo::{TodoChanges, TodoItem};
use crate::models::user::UserDto;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to one todo API on behalf of one [`Session`].
pub struct TodoClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
    cache: TodoCache,
}

impl TodoClient {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            cache: TodoCache::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &TodoCache {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match self.session.token(Utc::now())? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => {
                tracing::warn!("server rejected credentials, ending session");
                self.session.teardown()?;
                self.cache.clear();
                Err(ClientError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        Ok(self.send(request).await?.json().await?)
    }

    async fn authenticate(&self, request: RequestBuilder) -> Result<UserDto, ClientError> {
        let auth: AuthResponse = self.send_json(request).await?;
        self.session.begin(&auth, Utc::now())?;
        self.cache.clear();
        Ok(auth.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserDto, ClientError> {
        let request = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        self.authenticate(request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserDto, ClientError> {
        let request = self.http.post(self.url("/api/auth/register")).json(request);
        self.authenticate(request).await
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.teardown()?;
        self.cache.clear();
        Ok(())
    }

    pub async fn me(&self) -> Result<UserDto, ClientError> {
        self.send_json(self.http.get(self.url("/api/auth/me"))).await
    }

    pub async fn list_todos(&self, query: &ListTodosQuery) -> Result<Vec<TodoItem>, ClientError> {
        self.send_json(self.http.get(self.url("/api/todos")).query(query))
            .await
    }

    /// Re-reads the default list into the cache, unless a mutation overtook it.
    pub async fn refresh(&self) -> Result<Vec<TodoItem>, ClientError> {
        let ticket = self.cache.begin_read();
        let todos = self.list_todos(&ListTodosQuery::default()).await?;
        self.cache.apply_read_if_current(ticket, todos.clone());
        Ok(todos)
    }

    pub async fn get_todo(&self, todo_id: i32) -> Result<TodoItem, ClientError> {
        self.send_json(self.http.get(self.url(&format!("/api/todos/{todo_id}"))))
            .await
    }

    pub async fn create_todo(&self, request: &CreateTodoRequest) -> Result<TodoItem, ClientError> {
        let created: TodoItem = self
            .send_json(self.http.post(self.url("/api/todos")).json(request))
            .await?;
        self.cache.upsert(created.clone());
        Ok(created)
    }

    pub async fn update_todo(
        &self,
        todo_id: i32,
        request: &UpdateTodoRequest,
    ) -> Result<TodoItem, ClientError> {
        let updated: TodoItem = self
            .send_json(self.http.put(self.url(&format!("/api/todos/{todo_id}"))).json(request))
            .await?;
        self.cache.upsert(updated.clone());
        Ok(updated)
    }

    /// Flips completion by re-sending every field of `todo`.
    ///
    /// The cache shows the flip immediately, is rolled back if the server
    /// refuses, and is refreshed once the request settles either way.
    pub async fn toggle_todo(&self, todo: &TodoItem) -> Result<TodoItem, ClientError> {
        let snapshot = self.cache.optimistic_toggle(todo.id, Utc::now());
        let request = UpdateTodoRequest::from(TodoChanges::toggled(todo));
        let result: Result<TodoItem, ClientError> = self
            .send_json(self.http.put(self.url(&format!("/api/todos/{}", todo.id))).json(&request))
            .await;
        self.settle(snapshot, &result).await;
        result
    }

    /// Removes the todo from the cache first; see [`TodoClient::toggle_todo`].
    pub async fn delete_todo(&self, todo_id: i32) -> Result<(), ClientError> {
        let snapshot = self.cache.optimistic_delete(todo_id);
        let result = self
            .send(self.http.delete(self.url(&format!("/api/todos/{todo_id}"))))
            .await
            .map(|_| ());
        self.settle(snapshot, &result).await;
        result
    }

    async fn settle<T>(&self, snapshot: Snapshot, result: &Result<T, ClientError>) {
        if let Err(err) = result {
            tracing::warn!(error = %err, "optimistic update failed, rolling back");
            self.cache.rollback(snapshot);
            if matches!(err, ClientError::Unauthorized) {
                self.cache.clear();
                return;
            }
        }
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "refetch after mutation failed");
        }
    }

    pub async fn archive_todo(&self, todo_id: i32) -> Result<(), ClientError> {
        self.send(self.http.post(self.url(&format!("/api/todos/{todo_id}/archive"))))
            .await?;
        self.refresh().await?;
        Ok(())
    }

    pub async fn restore_todo(&self, todo_id: i32) -> Result<(), ClientError> {
        self.send(self.http.post(self.url(&format!("/api/todos/{todo_id}/restore"))))
            .await?;
        self.refresh().await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<TodoStats, ClientError> {
        self.send_json(self.http.get(self.url("/api/todos/stats")))
            .await
    }
}
