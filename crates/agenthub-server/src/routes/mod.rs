// Export route modules
pub mod agents;
pub mod ask;
pub mod health;

use axum::Router;
use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(ask::routes(state.clone()))
        .merge(agents::routes(state))
        .merge(health::routes())
}
