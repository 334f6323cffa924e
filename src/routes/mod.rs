pub mod auth;
pub mod health;
pub mod labels;
pub mod pages;
pub mod statuses;
pub mod tasks;
pub mod users;

use actix_web::web;

// Fixed segments (`/create/`, `/password/`) are registered ahead of `/{id}/...`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(pages::index)
        .service(health::health)
        .service(auth::login_page)
        .service(auth::login)
        .service(auth::logout)
        .service(
            web::scope("/users")
                .service(users::list)
                .service(users::signup_page)
                .service(users::signup)
                .service(users::password_page)
                .service(users::change_password)
                .service(users::update_page)
                .service(users::update)
                .service(users::delete_page)
                .service(users::delete),
        )
        .service(
            web::scope("/statuses")
                .service(statuses::list)
                .service(statuses::create_page)
                .service(statuses::create)
                .service(statuses::update_page)
                .service(statuses::update)
                .service(statuses::delete_page)
                .service(statuses::delete),
        )
        .service(
            web::scope("/labels")
                .service(labels::list)
                .service(labels::create_page)
                .service(labels::create)
                .service(labels::update_page)
                .service(labels::update)
                .service(labels::delete_page)
                .service(labels::delete),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::list)
                .service(tasks::create_page)
                .service(tasks::create)
                .service(tasks::detail)
                .service(tasks::update_page)
                .service(tasks::update)
                .service(tasks::delete_page)
                .service(tasks::delete),
        );
}
