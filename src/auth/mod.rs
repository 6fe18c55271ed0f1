use axum::{middleware, Router};

use crate::state::AppState;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use claims::Claims;
pub use extractors::AuthUser;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().merge(handlers::auth_routes()).merge(
        handlers::protected_routes().route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            extractors::require_token,
        )),
    )
}
