//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::health;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snapgate API",
        version = "0.1.0",
        description = "Caching gateway for generated snapshots. Stored artifacts are served by redirect; missing ones are generated, streamed to the caller, and stored in the same pass."
    ),
    paths(
        handlers::snap::get_snap,
        health::health_check,
    ),
    components(
        schemas(
            health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "snap", description = "Snapshot retrieval and generation"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/snap/{dir}/{id}"));
        assert!(spec.paths.paths.contains_key("/health"));
    }
}
