// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessments, auth, questions, submissions},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, assessments, questions, choices,
///   submissions).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (Database Pool + Config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    // Participant-facing assessment routes. Join and question-fetch are
    // window-gated in the handlers; joining never creates any row.
    let assessment_public_routes = Router::new()
        .route("/join/{code}", get(assessments::join_by_code))
        .route("/{id}/questions", get(assessments::questions_for_taking));

    // Owner-facing assessment routes.
    let assessment_owner_routes = Router::new()
        .route("/", post(assessments::create_assessment))
        .route("/mine", get(assessments::list_mine))
        .route(
            "/{id}",
            put(assessments::update_assessment).delete(assessments::delete_assessment),
        )
        .route("/{id}/questions/manage", get(assessments::questions_for_editing))
        .route("/{id}/grades", get(assessments::grade_report))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let question_routes = Router::new()
        // POST takes the owning assessment id, PUT the question id.
        .route(
            "/{id}",
            post(questions::add_question).put(questions::update_question),
        )
        .route(
            "/{id}/choices",
            post(questions::append_choices).put(questions::replace_choices),
        )
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let choice_routes = Router::new()
        .route("/{id}", put(questions::update_choice))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let submission_routes = Router::new()
        .route("/{assessment_id}/submit", post(submissions::submit))
        .route("/mine/latest", get(submissions::my_latest_result))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest(
            "/api/assessments",
            assessment_public_routes.merge(assessment_owner_routes),
        )
        .nest("/api/questions", question_routes)
        .nest("/api/choices", choice_routes)
        .nest("/api/submissions", submission_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
