use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use hrm_payroll::config::Config;
use hrm_payroll::db::init_db;
use hrm_payroll::docs::ApiDoc;
use hrm_payroll::routes::{self, Limiters, Services};
use hrm_payroll::service::projects::AssignmentBackend;
use hrm_payroll::store::{MySqlStore, Store};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    "OK"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, prefix = %config.api_prefix, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    let mysql = Arc::new(MySqlStore::new(pool));
    let store: Arc<dyn Store> = mysql.clone();
    let assignments: Arc<dyn AssignmentBackend> = mysql;

    // built once so caches and rate limit buckets are shared by every worker
    let services = Services::new(store, assignments, &config);
    let limiters = Limiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .service(health)
            .configure(|cfg| {
                services.register(cfg);
                routes::configure(cfg, &config.api_prefix, &limiters);
            })
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
