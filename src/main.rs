use actix_web::{middleware::Logger, web, App, HttpServer};
use log::info;
use std::io;

use task_manager::auth::AuthMiddleware;
use task_manager::config::Config;
use task_manager::{db, routes};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let pool = web::Data::new(pool);
    let settings = web::Data::new(config.auth_settings());

    info!("Starting task manager at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(settings.clone())
            .wrap(AuthMiddleware)
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
