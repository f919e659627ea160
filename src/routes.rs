use std::sync::Arc;

use crate::{
    api::{attendance, leave_request, performance, projects, summary},
    auth::middleware::auth_middleware,
    config::Config,
    service::{
        approval::SummaryApproval, leave_workflow::LeaveWorkflow, performance::PerformanceScorer,
        projects::{AssignmentBackend, ProjectDirectory},
        summary::SummaryBuilder,
    },
    store::Store,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web, web::Data};
use anyhow::anyhow;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Rate limiter settings, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct Limiters {
    protected: LimiterConfig,
    generate: LimiterConfig,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: build_limiter(config.rate_protected_per_min)?,
            generate: build_limiter(config.rate_generate_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))
}

/// Engine services shared by every worker.
#[derive(Clone)]
pub struct Services {
    store: Data<Arc<dyn Store>>,
    builder: Data<SummaryBuilder>,
    approval: Data<SummaryApproval>,
    leave: Data<LeaveWorkflow>,
    scorer: Data<PerformanceScorer>,
    directory: Data<ProjectDirectory>,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        assignments: Arc<dyn AssignmentBackend>,
        config: &Config,
    ) -> Self {
        Self {
            builder: Data::new(SummaryBuilder::new(
                store.clone(),
                config.reporting_offset,
                config.batch_concurrency,
            )),
            approval: Data::new(SummaryApproval::new(store.clone())),
            leave: Data::new(LeaveWorkflow::new(store.clone())),
            scorer: Data::new(PerformanceScorer::new(store.clone(), config.reporting_offset)),
            directory: Data::new(ProjectDirectory::new(
                assignments,
                config.assignment_cache_ttl_secs,
            )),
            store: Data::new(store),
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.store.clone())
            .app_data(self.builder.clone())
            .app_data(self.approval.clone())
            .app_data(self.leave.clone())
            .app_data(self.scorer.clone())
            .app_data(self.directory.clone());
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiters: &Limiters) {
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(Governor::new(&limiters.protected)) // rate limiting
            .service(
                web::scope("/summaries")
                    // /summaries
                    .service(
                        web::resource("").route(web::get().to(summary::list_summaries)),
                    )
                    // /summaries/generate (batch, separately limited)
                    .service(
                        web::resource("/generate")
                            .wrap(Governor::new(&limiters.generate))
                            .route(web::post().to(summary::generate_batch)),
                    )
                    // /summaries/me
                    .service(web::resource("/me").route(web::get().to(summary::my_summary)))
                    // /summaries/{id}/sign|approve|reject
                    .service(
                        web::resource("/{id}/sign").route(web::put().to(summary::sign_summary)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(summary::approve_summary)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(summary::reject_summary)),
                    )
                    // /summaries/{employee_id}/{year}/{month}
                    .service(
                        web::resource("/{employee_id}/{year}/{month}")
                            .route(web::get().to(summary::get_for_period)),
                    )
                    .service(
                        web::resource("/{employee_id}/{year}/{month}/generate")
                            .wrap(Governor::new(&limiters.generate))
                            .route(web::post().to(summary::generate_one)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // literal segments go before /leave/{id}
                    .service(
                        web::resource("/preview")
                            .route(web::post().to(leave_request::preview_leave)),
                    )
                    .service(
                        web::resource("/balance")
                            .route(web::get().to(leave_request::leave_balance)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/attendance").service(
                    web::resource("/hours").route(web::get().to(attendance::attendance_hours)),
                ),
            )
            .service(
                web::resource("/performance").route(web::get().to(performance::performance)),
            )
            .service(
                web::scope("/projects").service(
                    web::resource("/assigned").route(web::get().to(projects::assigned_projects)),
                ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenType, issue_for_test};
    use crate::model::employee::HoursSource;
    use crate::service::projects::MockAssignmentBackend;
    use crate::service::signature::sample_signature;
    use crate::store::memory::MemoryStore;
    use actix_web::http::StatusCode;
    use actix_web::App;
    use actix_web::test::{TestRequest, call_service, init_service, read_body_json};
    use chrono::FixedOffset;
    use serde_json::{Value, json};

    const SECRET: &str = "test-secret";

    fn config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: SECRET.into(),
            server_addr: "127.0.0.1:0".into(),
            rate_protected_per_min: 1000,
            rate_generate_per_min: 100,
            api_prefix: "/api".into(),
            reporting_offset: FixedOffset::east_opt(0).unwrap(),
            batch_concurrency: 2,
            assignment_cache_ttl_secs: 60,
            log_dir: "logs".into(),
            log_level: tracing::Level::DEBUG,
        }
    }

    fn bearer(role: u8, employee_id: Option<u64>) -> (&'static str, String) {
        let token = issue_for_test(role, employee_id, TokenType::Access, SECRET);
        ("Authorization", format!("Bearer {token}"))
    }

    fn admin() -> (&'static str, String) {
        bearer(1, None)
    }

    fn staff(employee_id: u64) -> (&'static str, String) {
        bearer(3, Some(employee_id))
    }

    macro_rules! app {
        () => {{
            let config = config();
            let store = Arc::new(MemoryStore::new());
            store.add_employee(1, HoursSource::Attendance);
            store.add_attendance(1, "2025-03-03T09:00:00Z", Some("2025-03-03T17:00:00Z"));
            let services = Services::new(store, Arc::new(MockAssignmentBackend::new()), &config);
            let limiters = Limiters::from_config(&config).unwrap();
            init_service(
                App::new()
                    .app_data(Data::new(config.clone()))
                    .configure(|cfg| {
                        services.register(cfg);
                        configure(cfg, &config.api_prefix, &limiters);
                    }),
            )
            .await
        }};
    }

    fn request(method: actix_web::http::Method, uri: &str) -> TestRequest {
        TestRequest::default()
            .method(method)
            .uri(uri)
            .peer_addr("127.0.0.1:40000".parse().unwrap())
    }

    #[actix_web::test]
    async fn requests_without_a_token_are_unauthorized() {
        let app = app!();
        let resp = call_service(
            &app,
            request(actix_web::http::Method::GET, "/api/summaries/me?year=2025&month=3").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn staff_cannot_generate_summaries() {
        let app = app!();
        let resp = call_service(
            &app,
            request(actix_web::http::Method::POST, "/api/summaries/1/2025/3/generate")
                .insert_header(staff(1))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn missing_month_is_reported_as_not_generated() {
        let app = app!();
        let resp = call_service(
            &app,
            request(actix_web::http::Method::GET, "/api/summaries/me?year=2025&month=2")
                .insert_header(staff(1))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["code"], "SUMMARY_NOT_GENERATED");
    }

    #[actix_web::test]
    async fn generate_sign_and_double_sign_over_http() {
        let app = app!();

        let resp = call_service(
            &app,
            request(actix_web::http::Method::POST, "/api/summaries/1/2025/3/generate")
                .insert_header(admin())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let generated: Value = read_body_json(resp).await;
        assert_eq!(generated["summary"]["status"], "DRAFT");
        assert_eq!(generated["summary"]["total_worked_hours"], 8.0);
        let id = generated["summary"]["id"].as_u64().unwrap();

        let sign = |who: (&'static str, String)| {
            request(actix_web::http::Method::PUT, &format!("/api/summaries/{id}/sign"))
                .insert_header(who)
                .set_json(json!({ "signature": sample_signature() }))
                .to_request()
        };

        let resp = call_service(&app, sign(staff(2))).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call_service(&app, sign(staff(1))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let signed: Value = read_body_json(resp).await;
        assert_eq!(signed["status"], "SIGNED_BY_STAFF");

        let resp = call_service(&app, sign(staff(1))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["code"], "ALREADY_SIGNED");
    }

    #[actix_web::test]
    async fn leave_preview_counts_working_days() {
        let app = app!();
        let resp = call_service(
            &app,
            request(actix_web::http::Method::POST, "/api/leave/preview")
                .insert_header(staff(1))
                .set_json(json!({ "start_date": "2025-03-07", "end_date": "2025-03-10" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["days"], json!(["2025-03-07", "2025-03-10"]));
    }

    #[actix_web::test]
    async fn over_long_hours_range_uses_the_shared_error_body() {
        let app = app!();
        let resp = call_service(
            &app,
            request(
                actix_web::http::Method::GET,
                "/api/attendance/hours?from=2024-01-01&to=2025-06-30",
            )
            .insert_header(staff(1))
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_RANGE");
    }

    #[test]
    fn limiter_accepts_low_and_zero_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(10).is_ok());
        assert!(build_limiter(100_000).is_ok());
    }
}
