mod common;

use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{test, web, App, HttpServer};
use pretty_assertions::assert_eq;
use serde_json::Value;

use task_manager::auth::middleware::LOGIN_REQUIRED;
use task_manager::auth::{generate_token, AuthMiddleware, SESSION_COOKIE};
use task_manager::forms::REQUIRED;
use task_manager::models::user::USERNAME_TAKEN;
use task_manager::models::User;
use task_manager::routes::{self, auth as login_routes, users};

fn signup_form<'a>(username: &'a str, password1: &'a str, password2: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("username", username),
        ("first_name", "Grace"),
        ("last_name", "Hopper"),
        ("password1", password1),
        ("password2", password2),
    ]
}

#[actix_rt::test]
async fn test_signup_then_login() {
    let pool = common::pool().await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/users/create/")
        .set_form(signup_form("grace", "compiler-1952", "compiler-1952"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(common::location(&resp), "/login/");
    assert_eq!(common::notice(&resp), users::USER_CREATED);

    let (user_id, hash) = User::credentials(&pool, "grace").await.unwrap().unwrap();
    assert_ne!(hash, "compiler-1952");

    let req = test::TestRequest::post()
        .uri("/login/")
        .set_form([("username", "grace"), ("password", "compiler-1952")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(common::location(&resp), "/");
    assert_eq!(common::notice(&resp), login_routes::LOGGED_IN);
    let session = common::response_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    assert_eq!(session.http_only(), Some(true));

    let req = test::TestRequest::get().uri("/").cookie(session).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["user"]["id"], user_id);
    assert_eq!(page["user"]["username"], "grace");
}

#[actix_rt::test]
async fn test_signup_rejects_taken_username() {
    let pool = common::pool().await;
    common::create_user(&pool, "grace").await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/users/create/")
        .set_form(signup_form("grace", "compiler-1952", "compiler-1952"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["username"][0], USERNAME_TAKEN);
}

#[actix_rt::test]
async fn test_signup_validation_errors() {
    let pool = common::pool().await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/users/create/")
        .set_form(signup_form("grace hopper", "1234567890", "0987654321"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    let errors = body["errors"].as_object().unwrap();
    assert!(errors.contains_key("username"));
    assert!(errors.contains_key("password1"));
    assert_eq!(
        body["errors"]["password2"][0],
        "The two password fields didn't match."
    );
    assert!(User::all(&pool).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_signup_blank_names_are_required() {
    let pool = common::pool().await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/users/create/")
        .set_form([
            ("username", "  "),
            ("first_name", "   "),
            ("last_name", "\t"),
            ("password1", "engine-42"),
            ("password2", "engine-42"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    for field in ["username", "first_name", "last_name"] {
        assert_eq!(body["errors"][field][0], REQUIRED, "{}", field);
    }
    assert!(User::all(&pool).await.unwrap().is_empty());
}

#[actix_rt::test]
async fn test_login_with_wrong_password() {
    let pool = common::pool().await;
    common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    for (username, password) in [("ada", "not-the-password"), ("nobody", common::PASSWORD)] {
        let req = test::TestRequest::post()
            .uri("/login/")
            .set_form([("username", username), ("password", password)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(common::response_cookie(&resp, SESSION_COOKIE).is_none());

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["__all__"][0], login_routes::INVALID_LOGIN);
    }
}

#[test_log::test(actix_rt::test)]
async fn test_protected_page_redirects_to_login_and_back() {
    let pool = common::pool().await;
    common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::get()
        .uri("/tasks/?status=1&self_tasks=on")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        common::location(&resp),
        "/login/?next=%2Ftasks%2F%3Fstatus%3D1%26self_tasks%3Don"
    );
    assert_eq!(common::notice(&resp), LOGIN_REQUIRED);

    // The login page echoes the destination and shows the notice.
    let req = test::TestRequest::get()
        .uri("/login/?next=%2Ftasks%2F%3Fstatus%3D1%26self_tasks%3Don")
        .cookie(common::response_cookie(&resp, "messages").unwrap())
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["next"], "/tasks/?status=1&self_tasks=on");
    assert_eq!(page["messages"][0]["text"], LOGIN_REQUIRED);

    let req = test::TestRequest::post()
        .uri("/login/")
        .set_form([
            ("username", "ada"),
            ("password", common::PASSWORD),
            ("next", "/tasks/?status=1&self_tasks=on"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(common::location(&resp), "/tasks/?status=1&self_tasks=on");
    let session = common::response_cookie(&resp, SESSION_COOKIE).unwrap();

    let req = test::TestRequest::get()
        .uri("/tasks/?status=1&self_tasks=on")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_login_next_from_query_and_unsafe_next() {
    let pool = common::pool().await;
    common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::post()
        .uri("/login/?next=%2Fstatuses%2F")
        .set_form([("username", "ada"), ("password", common::PASSWORD)])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(common::location(&resp), "/statuses/");

    let req = test::TestRequest::post()
        .uri("/login/")
        .set_form([
            ("username", "ada"),
            ("password", common::PASSWORD),
            ("next", "//evil.example.com/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(common::location(&resp), "/");
}

#[actix_rt::test]
async fn test_login_refuses_next_with_control_characters() {
    let pool = common::pool().await;
    common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    for next in ["/\t/evil.example.com/", "/\n/evil.example.com/"] {
        let req = test::TestRequest::post()
            .uri("/login/")
            .set_form([
                ("username", "ada"),
                ("password", common::PASSWORD),
                ("next", next),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(common::location(&resp), "/", "{:?}", next);
    }
}

#[actix_rt::test]
async fn test_logout_clears_session() {
    let pool = common::pool().await;
    let ada = common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    let resp = test::call_service(&app, common::get("/logout/", &ada).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(common::location(&resp), "/");
    assert_eq!(common::notice(&resp), login_routes::LOGGED_OUT);
    let cleared = common::response_cookie(&resp, SESSION_COOKIE).expect("removal cookie");
    assert_eq!(cleared.value(), "");

    // Logging out anonymously is harmless and says nothing.
    let req = test::TestRequest::post().uri("/logout/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(common::notices(&resp).is_empty());
}

#[actix_rt::test]
async fn test_bad_or_stale_sessions_are_anonymous() {
    let pool = common::pool().await;
    let ada = common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    let req = test::TestRequest::get()
        .uri("/statuses/")
        .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE, "garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // A token for an account that no longer exists.
    let ghost = common::create_user(&pool, "ghost").await;
    User::delete(&pool, ghost.id).await.unwrap();
    let resp = test::call_service(&app, common::get("/statuses/", &ghost).to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    // Bearer tokens work as well as the cookie.
    let token = generate_token(&common::settings(), ada.id).unwrap();
    let req = test::TestRequest::get()
        .uri("/statuses/")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_change_password() {
    let pool = common::pool().await;
    let ada = common::create_user(&pool, "ada").await;
    let app = common::app(&pool).await;

    let resp = test::call_service(&app, common::get("/users/password/", &ada).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = common::post(
        "/users/password/",
        &ada,
        &[
            ("old_password", "wrong-password"),
            ("new_password1", "analytical-1843"),
            ("new_password2", "analytical-1843"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"]["old_password"][0], users::WRONG_OLD_PASSWORD);

    let req = common::post(
        "/users/password/",
        &ada,
        &[
            ("old_password", common::PASSWORD),
            ("new_password1", "analytical-1843"),
            ("new_password2", "analytical-1843"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(common::location(&resp), "/users/");
    assert_eq!(common::notice(&resp), users::PASSWORD_CHANGED);

    let req = test::TestRequest::post()
        .uri("/login/")
        .set_form([("username", "ada"), ("password", "analytical-1843")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_rt::test]
async fn test_live_server_redirects_anonymous_visitors() {
    let pool = common::pool().await;
    let server_pool = pool.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_pool.clone()))
            .app_data(web::Data::new(common::settings()))
            .wrap(AuthMiddleware)
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("Failed to bind ephemeral port");
    let port = server.addrs()[0].port();
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let resp = client
        .get(format!("http://127.0.0.1:{}/tasks/", port))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
    assert_eq!(
        resp.headers()[reqwest::header::LOCATION].to_str().unwrap(),
        "/login/?next=%2Ftasks%2F"
    );

    let health: Value = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    handle.stop(true).await;
}
