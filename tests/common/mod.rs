#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use sqlx::SqlitePool;

use task_manager::auth::{self, generate_token, hash_password, AuthMiddleware, AuthSettings};
use task_manager::flash::{self, FlashMessage};
use task_manager::models::{
    Label, LabelInput, SignupInput, Status, StatusInput, Task, TaskData, User,
};
use task_manager::{db, routes};

pub const PASSWORD: &str = "correct-horse-7";

pub fn settings() -> AuthSettings {
    AuthSettings {
        secret: "integration-test-secret".to_string(),
        session_ttl_hours: 1,
        bcrypt_cost: 4,
    }
}

/// A fresh in-memory database with the schema applied.
pub async fn pool() -> SqlitePool {
    db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database")
}

/// The full application, wired like `main`.
pub async fn app(
    pool: &SqlitePool,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(settings()))
            .wrap(AuthMiddleware)
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> User {
    let input = SignupInput {
        username: username.to_string(),
        first_name: "Test".to_string(),
        last_name: username.to_string(),
        password1: PASSWORD.to_string(),
        password2: PASSWORD.to_string(),
    };
    let hash = hash_password(PASSWORD, 4).expect("hash");
    User::create(pool, &input, &hash)
        .await
        .expect("Failed to create user")
}

pub async fn make_superuser(pool: &SqlitePool, user_id: i64) {
    sqlx::query("UPDATE users SET is_superuser = 1 WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to promote user");
}

pub async fn create_status(pool: &SqlitePool, name: &str) -> Status {
    Status::create(pool, &StatusInput { name: name.into() })
        .await
        .expect("Failed to create status")
}

pub async fn create_label(pool: &SqlitePool, name: &str) -> Label {
    Label::create(pool, &LabelInput { name: name.into() })
        .await
        .expect("Failed to create label")
}

pub async fn create_task(
    pool: &SqlitePool,
    name: &str,
    creator: &User,
    performer: &User,
    status: &Status,
    labels: &[&Label],
) -> Task {
    let data = TaskData {
        name: name.to_string(),
        description: format!("{} description", name),
        status_id: status.id,
        performer_id: performer.id,
        label_ids: labels.iter().map(|l| l.id).collect(),
    };
    Task::create(pool, &data, creator.id)
        .await
        .expect("Failed to create task")
}

/// Session cookie for `user_id`, as the login handler would set it.
pub fn session_for(user_id: i64) -> Cookie<'static> {
    let settings = settings();
    let token = generate_token(&settings, user_id).expect("token");
    auth::session_cookie(token, &settings)
}

pub fn get(uri: &str, user: &User) -> test::TestRequest {
    test::TestRequest::get().uri(uri).cookie(session_for(user.id))
}

pub fn post(uri: &str, user: &User, form: &[(&str, &str)]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .cookie(session_for(user.id))
        .set_form(form)
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Notices queued by a redirect.
pub fn notices<B>(resp: &ServiceResponse<B>) -> Vec<FlashMessage> {
    resp.response()
        .cookies()
        .find(|c| c.name() == flash::FLASH_COOKIE)
        .map(|c| flash::decode(c.value()))
        .unwrap_or_default()
}

/// The single notice text of a redirect.
pub fn notice<B>(resp: &ServiceResponse<B>) -> String {
    let messages = notices(resp);
    assert_eq!(messages.len(), 1, "expected one notice, got {:?}", messages);
    messages[0].text.clone()
}

pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}
