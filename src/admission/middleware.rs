use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::{AdmissionPipeline, Admitted, PathParams, RoutePolicy};
use crate::errors::AdminError;

/// A pipeline bound to one route's policy; the state of the [`admit`]
/// middleware.
#[derive(Clone)]
pub struct GuardedRoute {
    pipeline: Arc<AdmissionPipeline>,
    policy: RoutePolicy,
}

impl GuardedRoute {
    pub fn new(pipeline: Arc<AdmissionPipeline>, policy: RoutePolicy) -> Self {
        Self { pipeline, policy }
    }
}

/// Admission middleware. Install with `route_layer` so path parameters are
/// available.
pub async fn admit(State(route): State<GuardedRoute>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    if parts.extensions.get::<Admitted>().is_some() {
        return AdminError::internal("admission context already set for this request").into_response();
    }

    // A segment the router cannot decode is carried as an error so the
    // pipeline can refuse it after authentication.
    let path_params: PathParams = match route.policy.provisioner_param() {
        Some(_) => Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
            .await
            .map(|Path(params)| params)
            .map_err(|rejection| rejection.body_text()),
        None => Ok(HashMap::new()),
    };

    match route.pipeline.admit(&route.policy, &parts, &path_params).await {
        Ok(admitted) => {
            parts.extensions.insert(admitted);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => err.into_response(),
    }
}
