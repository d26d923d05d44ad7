//! HTTP handler functions for the preschool and analytics services.

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use preschool_analytics::derive::{critical_views, derive_view, list_views};
use preschool_analytics::{AnalyticsError, report, tools};
use preschool_analytics_models::{CoverageParams, ProjectionParams};
use preschool_auth_models::{
    AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, TOKEN_TYPE, UserRecord,
    normalize_email,
};
use preschool_database::{queries, users};
use preschool_kindergarten_models::KindergartenInput;
use preschool_server_models::{
    ApiError, ApiHealth, KindergartenQueryParams, PDF_MEDIA_TYPE, REPORT_FILENAME,
    ReportQueryParams,
};

use crate::auth::Authenticated;
use crate::config::ServiceRole;
use crate::{AnalyticsState, AppState};

fn health(role: ServiceRole) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: role.as_str().to_string(),
    })
}

fn store_failure(action: &str, e: &impl std::fmt::Display) -> HttpResponse {
    log::error!("Failed to {action}: {e}");
    HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {action}")))
}

fn analytics_failure(action: &str, e: &AnalyticsError) -> HttpResponse {
    if e.is_not_found() {
        return HttpResponse::NotFound().json(ApiError::new(e.to_string()));
    }

    log::error!("Failed to {action}: {e}");
    let body = ApiError::new(format!("Failed to {action}"));
    if e.is_upstream() {
        HttpResponse::BadGateway().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

fn kindergarten_not_found(id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new(format!("Kindergarten '{id}' not found")))
}

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiError::new("Invalid email or password"))
}

/// `GET /api/health` (preschool role)
pub async fn preschool_health() -> HttpResponse {
    health(ServiceRole::Preschool)
}

/// `GET /api/health` (analytics role)
pub async fn analytics_health() -> HttpResponse {
    health(ServiceRole::Analytics)
}

/// `POST /api/auth/register`
///
/// Creates an account. Responds `409 Conflict` if the email is taken.
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> HttpResponse {
    let new = match body.into_inner().validate() {
        Ok(new) => new,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    let user = UserRecord {
        password_hash: state.auth.hash_password(&new.email, &new.password),
        email: new.email,
        role: new.role,
        created_at: chrono::Utc::now(),
    };

    match users::insert_user(state.db.as_ref(), &user).await {
        Ok(true) => {
            log::info!("Registered {} as {}", user.email, user.role);
            HttpResponse::Created().json(ProfileResponse::from(&user))
        }
        Ok(false) => HttpResponse::Conflict().json(ApiError::new("User already exists")),
        Err(e) => store_failure("register user", &e),
    }
}

/// `POST /api/auth/login`
///
/// Exchanges credentials for a bearer token.
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> HttpResponse {
    let body = body.into_inner();
    let email = normalize_email(&body.email);
    if email.is_empty() || body.password.is_empty() {
        return invalid_credentials();
    }

    let user = match users::get_user(state.db.as_ref(), &email).await {
        Ok(Some(user)) if state.auth.verify_password(&user, &body.password) => user,
        Ok(_) => {
            log::info!("Failed login for {email}");
            return invalid_credentials();
        }
        Err(e) => return store_failure("look up user", &e),
    };

    match state.auth.issue_token(&user.email, user.role) {
        Ok(issued) => HttpResponse::Ok().json(AuthResponse {
            access_token: issued.token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: i64::try_from(state.auth.ttl().as_secs()).unwrap_or(i64::MAX),
            email: user.email,
            role: user.role,
        }),
        Err(e) => store_failure("issue token", &e),
    }
}

/// `GET /api/auth/profile`
pub async fn profile(state: web::Data<AppState>, user: Authenticated) -> HttpResponse {
    let email = user.0.sub;
    match users::get_user(state.db.as_ref(), &email).await {
        Ok(Some(user)) => HttpResponse::Ok().json(ProfileResponse::from(&user)),
        Ok(None) => {
            HttpResponse::NotFound().json(ApiError::new(format!("User '{email}' not found")))
        }
        Err(e) => store_failure("look up user", &e),
    }
}

/// `GET /api/kindergartens`
///
/// Lists derived views, optionally filtered by `type` and ordered by
/// `sort`.
pub async fn list_kindergartens(
    state: web::Data<AppState>,
    params: web::Query<KindergartenQueryParams>,
) -> HttpResponse {
    let list_params = match params.to_list_params() {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    match queries::fetch_all_kindergartens(state.db.as_ref()).await {
        Ok(records) => HttpResponse::Ok().json(list_views(records, &list_params)),
        Err(e) => store_failure("list kindergartens", &e),
    }
}

/// `GET /api/kindergartens/critical`
pub async fn critical_kindergartens(state: web::Data<AppState>) -> HttpResponse {
    match queries::fetch_all_kindergartens(state.db.as_ref()).await {
        Ok(records) => HttpResponse::Ok().json(critical_views(records)),
        Err(e) => store_failure("list critical kindergartens", &e),
    }
}

/// `POST /api/kindergartens` (bearer token required)
pub async fn create_kindergarten(
    user: Authenticated,
    state: web::Data<AppState>,
    body: web::Json<KindergartenInput>,
) -> HttpResponse {
    let new = match body.into_inner().validate() {
        Ok(new) => new,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    match queries::insert_kindergarten(state.db.as_ref(), new).await {
        Ok(record) => {
            log::info!(
                "{} created kindergarten {} ({})",
                user.0.sub,
                record.id,
                record.name
            );
            HttpResponse::Created().json(derive_view(record))
        }
        Err(e) => store_failure("create kindergarten", &e),
    }
}

/// `GET /api/kindergartens/{id}`
pub async fn get_kindergarten(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    match queries::get_kindergarten(state.db.as_ref(), &id).await {
        Ok(Some(record)) => HttpResponse::Ok().json(derive_view(record)),
        Ok(None) => kindergarten_not_found(&id),
        Err(e) => store_failure("get kindergarten", &e),
    }
}

/// `PUT /api/kindergartens/{id}` (bearer token required)
pub async fn update_kindergarten(
    user: Authenticated,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<KindergartenInput>,
) -> HttpResponse {
    let id = path.into_inner();
    let new = match body.into_inner().validate() {
        Ok(new) => new,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    match queries::update_kindergarten(state.db.as_ref(), &id, new).await {
        Ok(Some(record)) => {
            log::info!("{} updated kindergarten {id}", user.0.sub);
            HttpResponse::Ok().json(derive_view(record))
        }
        Ok(None) => kindergarten_not_found(&id),
        Err(e) => store_failure("update kindergarten", &e),
    }
}

/// `DELETE /api/kindergartens/{id}` (bearer token required)
pub async fn delete_kindergarten(
    user: Authenticated,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();
    match queries::delete_kindergarten(state.db.as_ref(), &id).await {
        Ok(true) => {
            log::info!("{} deleted kindergarten {id}", user.0.sub);
            HttpResponse::NoContent().finish()
        }
        Ok(false) => kindergarten_not_found(&id),
        Err(e) => store_failure("delete kindergarten", &e),
    }
}

/// `GET /api/reports/municipalities`
///
/// Returns the municipality aggregates as JSON, or as a PDF download when
/// `format=pdf` is given or the `Accept` header names `application/pdf`.
pub async fn municipality_report(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<ReportQueryParams>,
) -> HttpResponse {
    let aggregates = match tools::list_municipality_aggregates(&state.records()).await {
        Ok(a) => a,
        Err(e) => return analytics_failure("build municipality report", &e),
    };

    let accept = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok());

    if !params.wants_pdf(accept) {
        return HttpResponse::Ok().json(aggregates);
    }

    let generated_at = chrono::Local::now().naive_local();
    let pdf = report::render_report(&aggregates, generated_at);

    HttpResponse::Ok()
        .content_type(PDF_MEDIA_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILENAME}\""),
        ))
        .body(pdf)
}

/// `GET /api/analytics/coverage?municipality=`
pub async fn coverage(
    state: web::Data<AnalyticsState>,
    params: web::Query<CoverageParams>,
) -> HttpResponse {
    match tools::coverage(
        state.population.as_ref(),
        &state.aggregates,
        params.municipality.trim(),
    )
    .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_failure("compute coverage", &e),
    }
}

/// `GET /api/analytics/ranking`
pub async fn ranking(state: web::Data<AnalyticsState>) -> HttpResponse {
    match tools::ranking(&state.aggregates).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_failure("rank municipalities", &e),
    }
}

/// `GET /api/analytics/projection?years=`
pub async fn projection(
    state: web::Data<AnalyticsState>,
    params: web::Query<ProjectionParams>,
) -> HttpResponse {
    match tools::projection(&state.aggregates, params.years()).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => analytics_failure("project enrollment", &e),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{App, HttpServer, test};
    use preschool_analytics::peer::PeerAggregateSource;
    use preschool_analytics::population::PopulationTable;
    use preschool_analytics::sources::{DatabaseRecords, RecordAggregates};
    use preschool_analytics_models::CoverageResult;
    use preschool_auth::{Authenticator, DEFAULT_TOKEN_TTL};
    use preschool_auth_models::UserRole;
    use preschool_database::db::open_db;
    use preschool_kindergarten_models::{KindergartenView, MunicipalityAggregate};
    use serde_json::json;
    use switchy_database::Database;

    use crate::{AggregateBackend, configure_analytics, configure_preschool};

    use super::*;

    /// A seeded record store in the temp directory, deleted on drop.
    struct TempStore {
        path: PathBuf,
        db: Arc<dyn Database>,
    }

    impl TempStore {
        async fn seeded() -> Self {
            let path = std::env::temp_dir().join(format!(
                "preschool_server_test_{}.db",
                uuid::Uuid::new_v4()
            ));
            let db = open_db(&path).await.unwrap();
            queries::seed_if_empty(db.as_ref()).await.unwrap();
            Self {
                path,
                db: Arc::from(db),
            }
        }

        fn state(&self) -> web::Data<AppState> {
            web::Data::new(AppState {
                db: Arc::clone(&self.db),
                auth: Arc::new(Authenticator::new(
                    "test-secret",
                    "test-salt",
                    DEFAULT_TOKEN_TTL,
                )),
            })
        }

        fn local_backend(&self) -> AggregateBackend {
            AggregateBackend::Local(RecordAggregates::new(DatabaseRecords::new(Arc::clone(
                &self.db,
            ))))
        }
    }

    impl Drop for TempStore {
        fn drop(&mut self) {
            for suffix in ["", "-journal", "-wal", "-shm"] {
                let mut path = self.path.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    fn bearer(state: &AppState) -> String {
        let issued = state
            .auth
            .issue_token("clerk@example.com", UserRole::Clerk)
            .unwrap();
        format!("Bearer {}", issued.token)
    }

    fn leptiric(max_capacity: i64) -> serde_json::Value {
        json!({
            "name": "Leptirić",
            "type": "private",
            "city": "Beograd",
            "municipality": "Palilula",
            "maxCapacity": max_capacity,
            "enrolled": 38
        })
    }

    #[actix_web::test]
    async fn temp_store_is_removed_on_drop() {
        let store = TempStore::seeded().await;
        let path = store.path.clone();
        assert!(path.exists());
        drop(store);
        assert!(!path.exists());
    }

    #[actix_web::test]
    async fn health_reports_role() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(store.state())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(body.healthy);
        assert_eq!(body.service, "preschool");
    }

    #[actix_web::test]
    async fn crud_lifecycle() {
        let store = TempStore::seeded().await;
        let state = store.state();
        let token = bearer(&state);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/kindergartens")
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .set_json(leptiric(40))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: KindergartenView = test::read_body_json(resp).await;
        assert_eq!(created.free_seats, 2);
        assert!(created.critical);
        let id = created.record.id.clone();

        let req = test::TestRequest::get()
            .uri(&format!("/api/kindergartens/{id}"))
            .to_request();
        let fetched: KindergartenView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched, created);

        let req = test::TestRequest::put()
            .uri(&format!("/api/kindergartens/{id}"))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .set_json(leptiric(50))
            .to_request();
        let updated: KindergartenView = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.free_seats, 12);
        assert!(!updated.critical);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/kindergartens/{id}"))
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );

        let req = test::TestRequest::get()
            .uri(&format!("/api/kindergartens/{id}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn mutations_require_a_valid_token() {
        let store = TempStore::seeded().await;
        let state = store.state();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/kindergartens")
            .set_json(leptiric(40))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "missing Authorization header");

        let forged = Authenticator::new("not-the-secret", "test-salt", DEFAULT_TOKEN_TTL)
            .issue_token("mallory@example.com", UserRole::Admin)
            .unwrap();
        let cases = [
            format!("Bearer {}", forged.token),
            "Bearer not.a.jwt".to_string(),
            "Basic Y2xlcms6c2VjcmV0".to_string(),
        ];
        for value in &cases {
            let req = test::TestRequest::put()
                .uri("/api/kindergartens/any")
                .insert_header((header::AUTHORIZATION, value.as_str()))
                .set_json(leptiric(40))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::UNAUTHORIZED,
                "Authorization: {value}"
            );
        }

        let seeded = queries::fetch_all_kindergartens(store.db.as_ref())
            .await
            .unwrap();
        let req = test::TestRequest::delete()
            .uri(&format!("/api/kindergartens/{}", seeded[0].id))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            queries::count_kindergartens(store.db.as_ref()).await.unwrap(),
            2
        );

        let req = test::TestRequest::get()
            .uri("/api/kindergartens")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn register_login_and_profile() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(store.state())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "email": " Ana@Example.com ",
                "password": "lozinka",
                "role": "sluzbenik"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let registered: ProfileResponse = test::read_body_json(resp).await;
        assert_eq!(registered.email, "ana@example.com");
        assert_eq!(registered.role, UserRole::Clerk);

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "email": "ana@example.com", "password": "other" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "email": "marko@example.com", "password": "x", "role": "root" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ana@example.com", "password": "wrong" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ANA@example.com", "password": "lozinka" }))
            .to_request();
        let login: AuthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.expires_in, 7200);
        assert_eq!(login.email, "ana@example.com");
        assert_eq!(login.role, UserRole::Clerk);
        let token = format!("Bearer {}", login.access_token);

        let req = test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .to_request();
        let profile: ProfileResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(profile, registered);

        let req = test::TestRequest::get().uri("/api/auth/profile").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/api/kindergartens")
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .set_json(leptiric(40))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    #[actix_web::test]
    async fn invalid_input_is_rejected() {
        let store = TempStore::seeded().await;
        let state = store.state();
        let token = bearer(&state);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/kindergartens")
            .insert_header((header::AUTHORIZATION, token.as_str()))
            .set_json(json!({ "name": "Zero", "type": "state", "maxCapacity": 0 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get()
            .uri("/api/kindergartens?type=municipal")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn listing_filters_and_sorts_seed_data() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(store.state())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/kindergartens?sort=free_seats")
            .to_request();
        let views: Vec<KindergartenView> = test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = views.iter().map(|v| v.record.name.as_str()).collect();
        assert_eq!(names, ["Plavi Cuperak", "Sumica"]);

        let req = test::TestRequest::get()
            .uri("/api/kindergartens?type=private")
            .to_request();
        let views: Vec<KindergartenView> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].record.name, "Sumica");

        let req = test::TestRequest::get()
            .uri("/api/kindergartens/critical")
            .to_request();
        let views: Vec<KindergartenView> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].record.municipality, "Vozdovac");
    }

    #[actix_web::test]
    async fn report_negotiates_json_and_pdf() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(store.state())
                .configure(configure_preschool),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/reports/municipalities")
            .to_request();
        let aggregates: Vec<MunicipalityAggregate> =
            test::call_and_read_body_json(&app, req).await;
        let names: Vec<&str> = aggregates.iter().map(|a| a.municipality.as_str()).collect();
        assert_eq!(names, ["Vozdovac", "Zvezdara"]);

        let req = test::TestRequest::get()
            .uri("/api/reports/municipalities?format=pdf")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            PDF_MEDIA_TYPE
        );
        assert!(
            resp.headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap()
                .to_str()
                .unwrap()
                .contains(REPORT_FILENAME)
        );
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"%PDF-1.4\n"));

        let req = test::TestRequest::get()
            .uri("/api/reports/municipalities")
            .insert_header((header::ACCEPT, PDF_MEDIA_TYPE))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert!(body.starts_with(b"%PDF-1.4\n"));
    }

    fn population() -> PopulationTable {
        [("Zvezdara", 200), ("Vozdovac", 50), ("Palilula", 300)]
            .into_iter()
            .collect()
    }

    fn analytics_state(aggregates: AggregateBackend) -> web::Data<AnalyticsState> {
        web::Data::new(AnalyticsState {
            population: Arc::new(population()),
            aggregates,
        })
    }

    #[actix_web::test]
    async fn coverage_over_local_store() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(analytics_state(store.local_backend()))
                .configure(configure_analytics),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/analytics/coverage?municipality=Zvezdara")
            .to_request();
        let result: CoverageResult = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result.capacity, 120);
        assert_eq!(result.deficit, 80);
        assert!((result.coverage_percent - 60.0).abs() < 1e-9);

        let req = test::TestRequest::get()
            .uri("/api/analytics/coverage?municipality=Palilula")
            .to_request();
        let result: CoverageResult = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result.capacity, 0);
        assert_eq!(result.deficit, 300);

        let req = test::TestRequest::get()
            .uri("/api/analytics/coverage?municipality=Atlantis")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn ranking_and_projection_over_local_store() {
        let store = TempStore::seeded().await;
        let app = test::init_service(
            App::new()
                .app_data(analytics_state(store.local_backend()))
                .configure(configure_analytics),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/analytics/ranking")
            .to_request();
        let ranked: Vec<MunicipalityAggregate> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ranked[0].municipality, "Vozdovac");

        let req = test::TestRequest::get()
            .uri("/api/analytics/projection?years=1")
            .to_request();
        let projected: Vec<MunicipalityAggregate> =
            test::call_and_read_body_json(&app, req).await;
        // Vozdovac 58 -> 60 (60.9), Zvezdara 95 -> 99 (99.75)
        assert_eq!(projected[0].total_enrolled, 60);
        assert_eq!(projected[1].total_enrolled, 99);

        let req = test::TestRequest::get()
            .uri("/api/analytics/projection?years=soon")
            .to_request();
        let unchanged: Vec<MunicipalityAggregate> =
            test::call_and_read_body_json(&app, req).await;
        assert_eq!(unchanged[0].total_enrolled, 58);
    }

    fn assert_same_ranking(peer: &[MunicipalityAggregate], local: &[MunicipalityAggregate]) {
        assert_eq!(peer.len(), local.len());
        for (p, l) in peer.iter().zip(local) {
            assert_eq!(p.municipality, l.municipality);
            assert_eq!(p.kindergarten_count, l.kindergarten_count);
            assert_eq!(p.total_capacity, l.total_capacity);
            assert_eq!(p.total_enrolled, l.total_enrolled);
            assert!((p.occupancy - l.occupancy).abs() < 1e-12);
        }
    }

    fn assert_same_coverage(peer: &CoverageResult, local: &CoverageResult) {
        assert_eq!(peer.municipality, local.municipality);
        assert_eq!(peer.population, local.population);
        assert_eq!(peer.capacity, local.capacity);
        assert_eq!(peer.deficit, local.deficit);
        assert!((peer.coverage_percent - local.coverage_percent).abs() < 1e-9);
    }

    #[actix_web::test]
    async fn peer_backend_matches_local_store() {
        let store = TempStore::seeded().await;
        let served = store.state();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(served.clone())
                .configure(configure_preschool)
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let peer = AggregateBackend::Peer(
            PeerAggregateSource::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap(),
        );
        let local = store.local_backend();
        let population = population();

        let peer_ranking = tools::ranking(&peer).await.unwrap();
        let local_ranking = tools::ranking(&local).await.unwrap();
        assert_eq!(local_ranking.len(), 2);
        assert_same_ranking(&peer_ranking, &local_ranking);

        for municipality in ["Zvezdara", "Vozdovac", "Palilula"] {
            let from_peer = tools::coverage(&population, &peer, municipality)
                .await
                .unwrap();
            let from_local = tools::coverage(&population, &local, municipality)
                .await
                .unwrap();
            assert_same_coverage(&from_peer, &from_local);
        }

        // The peer reads the live store, so new records show up on both sides.
        let added = KindergartenInput {
            name: "Bambi".to_string(),
            kind: Some("state".to_string()),
            city: "Beograd".to_string(),
            municipality: "Palilula".to_string(),
            max_capacity: 90,
            enrolled: 30,
        }
        .validate()
        .unwrap();
        queries::insert_kindergarten(store.db.as_ref(), added)
            .await
            .unwrap();

        let peer_ranking = tools::ranking(&peer).await.unwrap();
        assert_eq!(peer_ranking.len(), 3);
        assert_same_ranking(&peer_ranking, &tools::ranking(&local).await.unwrap());
        let from_peer = tools::coverage(&population, &peer, "Palilula")
            .await
            .unwrap();
        assert_eq!(from_peer.capacity, 90);
        assert_eq!(from_peer.deficit, 210);
        assert_same_coverage(
            &from_peer,
            &tools::coverage(&population, &local, "Palilula")
                .await
                .unwrap(),
        );

        let app = test::init_service(
            App::new()
                .app_data(analytics_state(peer))
                .configure(configure_analytics),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/api/analytics/ranking")
            .to_request();
        let served: Vec<MunicipalityAggregate> = test::call_and_read_body_json(&app, req).await;
        assert_same_ranking(&served, &tools::ranking(&local).await.unwrap());

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn unreachable_peer_is_bad_gateway() {
        let peer = PeerAggregateSource::new("http://127.0.0.1:9", Duration::from_millis(500))
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(analytics_state(AggregateBackend::Peer(peer)))
                .configure(configure_analytics),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/analytics/ranking")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Failed to rank municipalities");

        let req = test::TestRequest::get()
            .uri("/api/analytics/coverage?municipality=Atlantis")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
