// src/main.rs

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use taskshare::app_state::AppState;
use taskshare::config::Config;
use taskshare::session::Authentication;
use taskshare::tasks;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let state = AppState::init(config.clone()).await.map_err(|e| {
        error!("Could not initialise task store: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    let frontend_origin = config.frontend_origin.clone();
    let jwt_secret = config.jwt_secret.clone();

    info!("Server running at http://{}", config.bind_address);
    info!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(jwt_secret.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(tasks::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
