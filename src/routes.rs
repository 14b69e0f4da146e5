// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    docs,
    handlers::{admin, auth, functions, maintenance, profile, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, quiz, admin, functions).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, credential store).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(require_auth.clone()),
        );

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .layer(require_auth.clone());

    let quiz_routes = Router::new()
        .route("/modules", get(quiz::list_modules))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/submissions", post(quiz::start_submission))
                .route("/submissions/current", get(quiz::current_submission))
                .route("/submissions/{id}/answers", put(quiz::save_answer))
                .route("/submissions/{id}/progress", put(quiz::update_progress))
                .route("/submissions/{id}/complete", post(quiz::complete_submission))
                .layer(require_auth.clone()),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/import", post(admin::import_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/submissions/{id}", get(admin::submission_detail))
        .route(
            "/service-role",
            get(admin::service_role_status)
                .put(admin::set_service_role)
                .delete(admin::clear_service_role),
        )
        .route(
            "/maintenance/check-service-role",
            post(maintenance::check_service_role),
        )
        .route("/maintenance/recover-quiz", post(maintenance::recover_quiz))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    // These resolve the caller themselves.
    let function_routes = Router::new()
        .route("/get-all-submissions", post(functions::get_all_submissions))
        .route(
            "/mark-submission-processed",
            post(functions::mark_submission_processed),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/recover-quiz", get(maintenance::recover_quiz_with_key))
        .nest("/functions/v1", function_routes)
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
