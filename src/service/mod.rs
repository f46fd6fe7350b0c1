//! Blog HTTP service.
//!
//! ## Endpoints
//!
//! - `GET /` - Redirect to the first listing page
//! - `GET /page/:page?tags=...` - Ranked listing
//! - `GET /post/:id` - Single item
//! - `GET /admin/auth` - Login entry point state
//! - `POST /admin/auth` - Log in, sets the `auth` cookie
//! - `GET /admin` - Admin view (gated)
//! - `POST /admin/create` - Create an item (gated)
//! - `GET /admin/change/:id` - Edit-form prefill (gated)
//! - `POST /admin/change/:id` - Overwrite an item (gated)
//! - `POST /admin/remove/:id` - Delete an item (gated)
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{
    metrics_middleware, record_access_check, record_listing_metrics, record_login,
    request_logging_middleware, REQUEST_ID_HEADER,
};
pub use routes::{create_router, ErrorResponse, Session, LOGIN_PATH, SESSION_COOKIE};
pub use state::ServiceState;
