use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/members", post(handlers::add_member_form))
        .route("/members/:id/edit", post(handlers::edit_member_form))
        .route("/members/:id/delete", post(handlers::delete_member_form))
        .route("/renew", post(handlers::renew_member_form))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/members", get(handlers::list_members).post(handlers::create_member))
        .route(
            "/api/members/:id",
            get(handlers::get_member)
                .patch(handlers::update_member)
                .delete(handlers::delete_member),
        )
        .route(
            "/api/members/:id/renewals",
            get(handlers::member_renewals).post(handlers::renew_member),
        )
        .with_state(state)
}
