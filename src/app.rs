use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::admission::{admit, AdmissionPipeline, RoutePolicy, PROVISIONER_NAME_PARAM};
use crate::authority::Authority;
use crate::routes::{health, provisioners};
use crate::store::AdminStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
}

impl AppState {
    pub fn new(authority: Arc<dyn Authority>, store: Arc<dyn AdminStore>) -> Self {
        Self::from_pipeline(AdmissionPipeline::new(authority, store))
    }

    pub fn from_pipeline(pipeline: AdmissionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let pipeline = &state.pipeline;
    let with_provisioner = RoutePolicy::authenticated().load_provisioner(PROVISIONER_NAME_PARAM);

    let admin_routes = Router::new()
        .route(
            "/provisioners/:provisionerName",
            get(provisioners::get_provisioner)
                .route_layer(from_fn_with_state(pipeline.route(with_provisioner), admit)),
        )
        .route(
            "/provisioners/:provisionerName/policy",
            get(provisioners::get_provisioner_policy).route_layer(from_fn_with_state(
                pipeline.route(with_provisioner.check_action(true)),
                admit,
            )),
        )
        // External account binding keys are managed by the linked management plane.
        .route(
            "/acme/eab/:provisionerName",
            get(provisioners::get_eab_requirement).route_layer(from_fn_with_state(
                pipeline.route(with_provisioner.check_action(false)),
                admit,
            )),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/admin", admin_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
