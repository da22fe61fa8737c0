use actix_web::http::header;
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::engine::derive_view;
use crate::errors::ApiError;
use crate::models::dto::{CreateTodoRequest, ListTodosQuery, UpdateTodoRequest};
use crate::repository::Database;

#[get("/todos")]
pub async fn list_todos(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    query: web::Query<ListTodosQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let filter = query.filter();
    let todos = web::block(move || db.list_todos(&user.user_id, Some(&filter))).await??;
    let todos = match query.view() {
        Some(view) => derive_view(Some(&todos), &view),
        None => todos,
    };
    Ok(HttpResponse::Ok().json(todos))
}

#[get("/todos/stats")]
pub async fn todo_stats(
    user: AuthenticatedUser,
    db: web::Data<Database>,
) -> Result<HttpResponse, ApiError> {
    let stats = web::block(move || db.todo_stats(&user.user_id, Utc::now())).await??;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/todos/{id}")]
pub async fn get_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let todo = web::block(move || db.get_todo(id, &user.user_id)).await??;
    match todo {
        Some(todo) => Ok(HttpResponse::Ok().json(todo)),
        None => Err(ApiError::not_found()),
    }
}

#[post("/todos")]
pub async fn create_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    new_todo: web::Json<CreateTodoRequest>,
) -> Result<HttpResponse, ApiError> {
    let new_todo = new_todo.into_inner();
    new_todo.validate()?;
    let todo = web::block(move || db.create_todo(new_todo.into_new_todo(), &user.user_id)).await??;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/api/todos/{}", todo.id)))
        .json(todo))
}

#[put("/todos/{id}")]
pub async fn update_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
    updated_todo: web::Json<UpdateTodoRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let updated_todo = updated_todo.into_inner();
    updated_todo.validate()?;
    let todo =
        web::block(move || db.update_todo(id, updated_todo.into_changes(), &user.user_id)).await??;
    match todo {
        Some(todo) => Ok(HttpResponse::Ok().json(todo)),
        None => Err(ApiError::not_found()),
    }
}

#[post("/todos/{id}/toggle")]
pub async fn toggle_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let todo = web::block(move || db.toggle_todo(id, &user.user_id)).await??;
    match todo {
        Some(todo) => Ok(HttpResponse::Ok().json(todo)),
        None => Err(ApiError::not_found()),
    }
}

fn no_content_or_not_found(found: bool) -> Result<HttpResponse, ApiError> {
    if found {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::not_found())
    }
}

#[delete("/todos/{id}")]
pub async fn delete_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let deleted = web::block(move || db.delete_todo(id, &user.user_id)).await??;
    no_content_or_not_found(deleted)
}

#[post("/todos/{id}/archive")]
pub async fn archive_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let archived = web::block(move || db.archive_todo(id, &user.user_id)).await??;
    no_content_or_not_found(archived)
}

#[post("/todos/{id}/restore")]
pub async fn restore_todo(
    user: AuthenticatedUser,
    db: web::Data<Database>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let restored = web::block(move || db.restore_todo(id, &user.user_id)).await??;
    no_content_or_not_found(restored)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use crate::engine::TodoStats;
    use crate::errors::ErrorBody;
    use crate::models::dto::AuthResponse;
    use crate::models::todo::{Priority, TodoItem};
    use actix_web::http::{header, StatusCode};
    use actix_web::test::{self, TestRequest};
    use serde_json::json;

    fn create_one_test_todo(token: &str, title: &str, priority: u8) -> TestRequest {
        TestRequest::post()
            .uri("/api/todos")
            .insert_header(bearer(token))
            .set_json(json!({ "title": title, "priority": priority }))
    }

    #[actix_web::test]
    async fn test_todos_require_a_token() {
        let app = test_app!(state());
        for req in [
            TestRequest::get().uri("/api/todos"),
            TestRequest::get().uri("/api/todos/stats"),
            TestRequest::get().uri("/api/todos/1"),
            TestRequest::delete().uri("/api/todos/1"),
            TestRequest::post().uri("/api/todos/1/archive"),
        ] {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(StatusCode::UNAUTHORIZED, resp.status());
        }

        let req = TestRequest::get()
            .uri("/api/todos")
            .insert_header(bearer("garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, resp.status());
    }

    #[actix_web::test]
    async fn test_create_and_list_todo() {
        let app = test_app!(state());
        let auth: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;

        let resp = test::call_service(&app, create_one_test_todo(&auth.token, "A", 1).to_request()).await;
        assert_eq!(StatusCode::CREATED, resp.status());
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_string();
        let created: TodoItem = test::read_body_json(resp).await;
        assert_eq!(location, format!("/api/todos/{}", created.id));
        assert_eq!(created.priority, Priority::Medium);
        assert_eq!(created.user_id, auth.user.id);

        let req = TestRequest::get()
            .uri("/api/todos")
            .insert_header(bearer(&auth.token))
            .to_request();
        let listed: Vec<TodoItem> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_completed);
        assert!(listed[0].completed_at.is_none());

        let req = TestRequest::get()
            .uri(&location)
            .insert_header(bearer(&auth.token))
            .to_request();
        let fetched: TodoItem = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, created);
    }

    #[actix_web::test]
    async fn test_invalid_todo_reports_field_details() {
        let app = test_app!(state());
        let auth: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;

        let req = TestRequest::post()
            .uri("/api/todos")
            .insert_header(bearer(&auth.token))
            .set_json(json!({ "title": "  ", "tags": ["ok", " "] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.code, "VALIDATION_ERROR");
        let fields: Vec<String> = body.details.unwrap().into_iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["tags", "title"]);

        let req = TestRequest::post()
            .uri("/api/todos")
            .insert_header(bearer(&auth.token))
            .set_json(json!({ "title": "A", "priority": 9 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    }

    #[actix_web::test]
    async fn test_update_toggle_and_completion_timestamps() {
        let app = test_app!(state());
        let auth: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;
        let created: TodoItem =
            test::call_and_read_body_json(&app, create_one_test_todo(&auth.token, "A", 1).to_request())
                .await;

        let req = TestRequest::put()
            .uri(&format!("/api/todos/{}", created.id))
            .insert_header(bearer(&auth.token))
            .set_json(json!({
                "title": "A",
                "isCompleted": true,
                "priority": "High",
                "tags": ["work"],
            }))
            .to_request();
        let updated: TodoItem = test::call_and_read_body_json(&app, req).await;
        assert!(updated.is_completed);
        assert!(updated.completed_at.is_some());
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.tags, vec!["work"]);

        let req = TestRequest::post()
            .uri(&format!("/api/todos/{}/toggle", created.id))
            .insert_header(bearer(&auth.token))
            .to_request();
        let toggled: TodoItem = test::call_and_read_body_json(&app, req).await;
        assert!(!toggled.is_completed);
        assert!(toggled.completed_at.is_none());

        let req = TestRequest::put()
            .uri("/api/todos/9999")
            .insert_header(bearer(&auth.token))
            .set_json(json!({ "title": "A", "isCompleted": false, "priority": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::NOT_FOUND, resp.status());
    }

    #[actix_web::test]
    async fn test_archive_restore_delete_and_stats() {
        let app = test_app!(state());
        let auth: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;
        let mut ids = Vec::new();
        for (title, priority) in [("low", 0), ("medium", 1), ("high", 2)] {
            let created: TodoItem = test::call_and_read_body_json(
                &app,
                create_one_test_todo(&auth.token, title, priority).to_request(),
            )
            .await;
            ids.push(created.id);
        }
        for id in &ids[..2] {
            let req = TestRequest::post()
                .uri(&format!("/api/todos/{id}/toggle"))
                .insert_header(bearer(&auth.token))
                .to_request();
            assert_eq!(StatusCode::OK, test::call_service(&app, req).await.status());
        }

        let stats_req = || {
            TestRequest::get()
                .uri("/api/todos/stats")
                .insert_header(bearer(&auth.token))
                .to_request()
        };
        let stats: TodoStats = test::call_and_read_body_json(&app, stats_req()).await;
        assert_eq!((stats.total, stats.completed, stats.active, stats.high_priority), (3, 2, 1, 1));

        let req = TestRequest::post()
            .uri(&format!("/api/todos/{}/archive", ids[2]))
            .insert_header(bearer(&auth.token))
            .to_request();
        assert_eq!(StatusCode::NO_CONTENT, test::call_service(&app, req).await.status());
        let stats: TodoStats = test::call_and_read_body_json(&app, stats_req()).await;
        assert_eq!((stats.total, stats.high_priority), (2, 0));

        let req = TestRequest::get()
            .uri("/api/todos?includeArchived=true&priority=2")
            .insert_header(bearer(&auth.token))
            .to_request();
        let archived: Vec<TodoItem> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(archived.len(), 1);
        assert!(archived[0].is_archived);

        let req = TestRequest::post()
            .uri(&format!("/api/todos/{}/restore", ids[2]))
            .insert_header(bearer(&auth.token))
            .to_request();
        assert_eq!(StatusCode::NO_CONTENT, test::call_service(&app, req).await.status());

        let req = TestRequest::delete()
            .uri(&format!("/api/todos/{}", ids[0]))
            .insert_header(bearer(&auth.token))
            .to_request();
        assert_eq!(StatusCode::NO_CONTENT, test::call_service(&app, req).await.status());
        let req = TestRequest::delete()
            .uri(&format!("/api/todos/{}", ids[0]))
            .insert_header(bearer(&auth.token))
            .to_request();
        assert_eq!(StatusCode::NOT_FOUND, test::call_service(&app, req).await.status());

        let stats: TodoStats = test::call_and_read_body_json(&app, stats_req()).await;
        assert_eq!((stats.total, stats.completed, stats.high_priority), (2, 1, 1));
    }

    #[actix_web::test]
    async fn test_search_and_sort_through_query() {
        let app = test_app!(state());
        let auth: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;
        for (title, priority) in [("Buy milk", 0), ("Write report", 2), ("buy bread", 1)] {
            let resp = test::call_service(
                &app,
                create_one_test_todo(&auth.token, title, priority).to_request(),
            )
            .await;
            assert_eq!(StatusCode::CREATED, resp.status());
        }

        let req = TestRequest::get()
            .uri("/api/todos?search=BUY&sort=title&direction=asc")
            .insert_header(bearer(&auth.token))
            .to_request();
        let found: Vec<TodoItem> = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = found.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["buy bread", "Buy milk"]);

        let req = TestRequest::get()
            .uri("/api/todos?sort=priority&direction=desc")
            .insert_header(bearer(&auth.token))
            .to_request();
        let sorted: Vec<TodoItem> = test::call_and_read_body_json(&app, req).await;
        let priorities: Vec<Priority> = sorted.iter().map(|t| t.priority).collect();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);

        let req = TestRequest::get()
            .uri("/api/todos?sort=sideways")
            .insert_header(bearer(&auth.token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
    }

    #[actix_web::test]
    async fn test_users_cannot_reach_each_others_todos() {
        let app = test_app!(state());
        let ada: AuthResponse =
            test::call_and_read_body_json(&app, register_request("ada@example.com").to_request())
                .await;
        let bob: AuthResponse =
            test::call_and_read_body_json(&app, register_request("bob@example.com").to_request())
                .await;
        let created: TodoItem =
            test::call_and_read_body_json(&app, create_one_test_todo(&ada.token, "private", 1).to_request())
                .await;

        let uri = format!("/api/todos/{}", created.id);
        for req in [
            TestRequest::get().uri(&uri),
            TestRequest::put()
                .uri(&uri)
                .set_json(json!({ "title": "mine now", "isCompleted": true, "priority": 1 })),
            TestRequest::delete().uri(&uri),
            TestRequest::post().uri(&format!("{uri}/archive")),
            TestRequest::post().uri(&format!("{uri}/toggle")),
        ] {
            let resp = test::call_service(&app, req.insert_header(bearer(&bob.token)).to_request()).await;
            assert_eq!(StatusCode::NOT_FOUND, resp.status());
        }

        let req = TestRequest::get().uri("/api/todos").insert_header(bearer(&bob.token)).to_request();
        let listed: Vec<TodoItem> = test::call_and_read_body_json(&app, req).await;
        assert!(listed.is_empty());

        let req = TestRequest::get().uri(&uri).insert_header(bearer(&ada.token)).to_request();
        let untouched: TodoItem = test::call_and_read_body_json(&app, req).await;
        assert_eq!(untouched, created);
    }
}
