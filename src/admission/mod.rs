//! Admission pipeline for administrative requests.
//!
//! Every admin route runs the same guards in the same order:
//!
//! 1. feature gate: the admin API must be enabled on the authority
//! 2. authentication: bearer token verified by the authority
//! 3. provisioner resolution (routes that name a provisioner)
//! 4. capability gate (routes that declare standalone support)
//!
//! A route picks which of the optional guards it needs through
//! [`RoutePolicy`]; it cannot change their order. The first guard that fails
//! ends the request. Context only grows on the success path: each guard
//! consumes the previous stage and returns a larger one, and the final
//! [`Admitted`] value is what handlers read.

mod context;
mod extract;
mod middleware;

pub use context::{Admitted, Authenticated, ProvisionerLoaded};
pub use extract::{CurrentAdmin, CurrentProvisioner};
pub use middleware::{admit, GuardedRoute};

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::authority::Authority;
use crate::errors::{AdminError, AdminResult};
use crate::store::{AdminStore, BackendKind};

/// Path parameter carrying the provisioner name on admin routes.
pub const PROVISIONER_NAME_PARAM: &str = "provisionerName";

/// Route path parameters, or the router's reason for failing to decode them.
pub type PathParams = Result<HashMap<String, String>, String>;

/// States an admission run moves through. Transitions are linear; any state
/// may jump to `Rejected`. `Admitted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Entered,
    FeatureChecked,
    Authenticated,
    ResourceResolved,
    CapabilityChecked,
    Admitted,
    Rejected,
}

impl AdmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionState::Entered => "entered",
            AdmissionState::FeatureChecked => "feature_checked",
            AdmissionState::Authenticated => "authenticated",
            AdmissionState::ResourceResolved => "resource_resolved",
            AdmissionState::CapabilityChecked => "capability_checked",
            AdmissionState::Admitted => "admitted",
            AdmissionState::Rejected => "rejected",
        }
    }
}

/// Receives every state transition of every admission run.
pub trait AdmissionObserver: Send + Sync {
    fn on_transition(&self, state: AdmissionState);
}

/// Which optional guards a route composes. The feature gate and
/// authentication always run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    provisioner_param: Option<&'static str>,
    supported_in_standalone: Option<bool>,
}

impl RoutePolicy {
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Resolve the provisioner named by the given path parameter.
    pub fn load_provisioner(mut self, param: &'static str) -> Self {
        self.provisioner_param = Some(param);
        self
    }

    /// Gate the route on the store's deployment mode.
    pub fn check_action(mut self, supported_in_standalone: bool) -> Self {
        self.supported_in_standalone = Some(supported_in_standalone);
        self
    }

    pub fn provisioner_param(&self) -> Option<&'static str> {
        self.provisioner_param
    }

    pub fn supported_in_standalone(&self) -> Option<bool> {
        self.supported_in_standalone
    }
}

pub struct AdmissionPipeline {
    authority: Arc<dyn Authority>,
    store: Arc<dyn AdminStore>,
    observer: Option<Arc<dyn AdmissionObserver>>,
}

impl AdmissionPipeline {
    pub fn new(authority: Arc<dyn Authority>, store: Arc<dyn AdminStore>) -> Self {
        Self {
            authority,
            store,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AdmissionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn authority(&self) -> &Arc<dyn Authority> {
        &self.authority
    }

    pub fn store(&self) -> &Arc<dyn AdminStore> {
        &self.store
    }

    /// Binds this pipeline to a route policy for use as axum middleware.
    pub fn route(self: &Arc<Self>, policy: RoutePolicy) -> GuardedRoute {
        GuardedRoute::new(Arc::clone(self), policy)
    }

    /// Runs every guard the policy composes, in order.
    pub async fn admit(
        &self,
        policy: &RoutePolicy,
        parts: &Parts,
        path_params: &PathParams,
    ) -> AdminResult<Admitted> {
        self.transition(AdmissionState::Entered);

        match self.run_guards(policy, parts, path_params).await {
            Ok(admitted) => {
                self.transition(AdmissionState::Admitted);
                Ok(admitted)
            }
            Err(err) => {
                self.transition(AdmissionState::Rejected);
                tracing::debug!(
                    category = err.category(),
                    message = %err,
                    "admin request rejected"
                );
                Err(err)
            }
        }
    }

    async fn run_guards(
        &self,
        policy: &RoutePolicy,
        parts: &Parts,
        path_params: &PathParams,
    ) -> AdminResult<Admitted> {
        self.require_api_enabled()?;
        self.transition(AdmissionState::FeatureChecked);

        let authenticated = self.authenticate(parts).await?;
        self.transition(AdmissionState::Authenticated);

        let admitted = match policy.provisioner_param() {
            Some(param) => {
                let params = path_params.as_ref().map_err(|reason| {
                    AdminError::wrap_internal(
                        anyhow::anyhow!(reason.clone()),
                        "error reading provisioner name",
                    )
                })?;
                let name = params.get(param).map(String::as_str).unwrap_or_default();
                let loaded = self.load_provisioner_by_name(authenticated, name).await?;
                self.transition(AdmissionState::ResourceResolved);
                Admitted::from(loaded)
            }
            None => Admitted::from(authenticated),
        };

        if let Some(supported_in_standalone) = policy.supported_in_standalone() {
            self.check_action(supported_in_standalone)?;
            self.transition(AdmissionState::CapabilityChecked);
        }

        Ok(admitted)
    }

    pub fn require_api_enabled(&self) -> AdminResult<()> {
        if !self.authority.is_admin_api_enabled() {
            return Err(AdminError::not_implemented("administration API not enabled"));
        }
        Ok(())
    }

    /// An absent header and an empty one are the same thing: no token. The
    /// authority is only consulted when there is something to verify, and
    /// only ever sees the header value exactly as sent.
    pub async fn authenticate(&self, parts: &Parts) -> AdminResult<Authenticated> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => value
                .to_str()
                .map_err(|_| AdminError::unauthorized("invalid authorization header token"))?,
            None => "",
        };

        if token.is_empty() {
            return Err(AdminError::unauthorized("missing authorization header token"));
        }

        let admin = self.authority.authorize_admin_token(parts, token).await?;
        tracing::debug!(admin_id = %admin.id, scope = admin.scope.as_str(), "admin authenticated");

        Ok(Authenticated::new(admin))
    }

    /// Resolves a provisioner name to its stored record. Both lookup failures
    /// surface as internal errors carrying the name the caller supplied.
    pub async fn load_provisioner_by_name(
        &self,
        authenticated: Authenticated,
        name: &str,
    ) -> AdminResult<ProvisionerLoaded> {
        // TODO: split unknown provisioner names out into a 404 once clients stop relying on the 500.
        let provisioner = self
            .authority
            .load_provisioner_by_name(name)
            .await
            .map_err(|err| AdminError::wrap_internal(err, format!("error loading provisioner {name}")))?;

        let record = self
            .store
            .get_provisioner(&provisioner.id)
            .await
            .map_err(|err| AdminError::wrap_internal(err, format!("error retrieving provisioner {name}")))?;

        Ok(authenticated.with_provisioner(record))
    }

    /// Decides from the live store binding whether the action may run.
    /// Unsupported backends are refused before the route flag is consulted.
    pub fn check_action(&self, supported_in_standalone: bool) -> AdminResult<()> {
        let kind = self.store.backend_kind();

        if kind == BackendKind::Unsupported {
            return Err(AdminError::not_implemented("operation not supported"));
        }

        if supported_in_standalone {
            return Ok(());
        }

        if !self.store.supports_linked_mode() {
            return Err(AdminError::not_implemented(
                "operation not supported in standalone mode",
            ));
        }

        Ok(())
    }

    fn transition(&self, state: AdmissionState) {
        tracing::debug!(state = state.as_str(), "admission transition");
        if let Some(observer) = &self.observer {
            observer.on_transition(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminIdentity, AdminScope, ProvisionerRecord, ProvisionerRef, ProvisionerType};
    use crate::store::{StoreError, StoreResult};
    use async_trait::async_trait;
    use axum::http::Request;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    const TOKEN: &str = "valid-token";

    struct CountingAuthority {
        enabled: AtomicBool,
        admin: AdminIdentity,
        provisioners: HashMap<String, ProvisionerRef>,
        authorize_calls: AtomicUsize,
        lookup_calls: AtomicUsize,
        seen_tokens: Mutex<Vec<String>>,
    }

    impl CountingAuthority {
        fn new() -> Self {
            let acme = ProvisionerRef {
                id: "prov-acme-id".to_string(),
                name: "acme".to_string(),
                kind: ProvisionerType::Acme,
            };
            let orphan = ProvisionerRef {
                id: "prov-orphan-id".to_string(),
                name: "orphan".to_string(),
                kind: ProvisionerType::Jwk,
            };
            Self {
                enabled: AtomicBool::new(true),
                admin: AdminIdentity::new(Uuid::new_v4(), "root@example.com", AdminScope::SuperAdmin),
                provisioners: [acme, orphan].into_iter().map(|p| (p.name.clone(), p)).collect(),
                authorize_calls: AtomicUsize::new(0),
                lookup_calls: AtomicUsize::new(0),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Authority for CountingAuthority {
        fn is_admin_api_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        async fn authorize_admin_token(&self, _parts: &Parts, token: &str) -> AdminResult<AdminIdentity> {
            self.authorize_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tokens.lock().unwrap().push(token.to_string());
            if token == TOKEN {
                Ok(self.admin.clone())
            } else {
                Err(AdminError::unauthorized("token is expired"))
            }
        }

        async fn load_provisioner_by_name(&self, name: &str) -> anyhow::Result<ProvisionerRef> {
            self.lookup_calls.fetch_add(1, Ordering::SeqCst);
            self.provisioners
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("provisioner {name} not found"))
        }
    }

    struct CountingStore {
        kind: Mutex<BackendKind>,
        records: HashMap<String, ProvisionerRecord>,
        get_calls: AtomicUsize,
        seen_ids: Mutex<Vec<String>>,
    }

    impl CountingStore {
        fn new(kind: BackendKind) -> Self {
            let acme = ProvisionerRecord::new("prov-acme-id", "acme", ProvisionerType::Acme);
            Self {
                kind: Mutex::new(kind),
                records: [(acme.id.clone(), acme)].into_iter().collect(),
                get_calls: AtomicUsize::new(0),
                seen_ids: Mutex::new(Vec::new()),
            }
        }

        fn set_kind(&self, kind: BackendKind) {
            *self.kind.lock().unwrap() = kind;
        }
    }

    #[async_trait]
    impl AdminStore for CountingStore {
        async fn get_provisioner(&self, id: &str) -> StoreResult<ProvisionerRecord> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_ids.lock().unwrap().push(id.to_string());
            self.records
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("provisioner {id}")))
        }

        async fn list_provisioners(&self) -> StoreResult<Vec<ProvisionerRecord>> {
            Ok(self.records.values().cloned().collect())
        }

        fn backend_kind(&self) -> BackendKind {
            *self.kind.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        states: Mutex<Vec<AdmissionState>>,
    }

    impl AdmissionObserver for RecordingObserver {
        fn on_transition(&self, state: AdmissionState) {
            self.states.lock().unwrap().push(state);
        }
    }

    struct Harness {
        authority: Arc<CountingAuthority>,
        store: Arc<CountingStore>,
        observer: Arc<RecordingObserver>,
        pipeline: AdmissionPipeline,
    }

    fn harness(kind: BackendKind) -> Harness {
        let authority = Arc::new(CountingAuthority::new());
        let store = Arc::new(CountingStore::new(kind));
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = AdmissionPipeline::new(authority.clone(), store.clone())
            .with_observer(observer.clone());
        Harness {
            authority,
            store,
            observer,
            pipeline,
        }
    }

    fn request(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/provisioners/acme");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn params(name: &str) -> PathParams {
        Ok(HashMap::from([(PROVISIONER_NAME_PARAM.to_string(), name.to_string())]))
    }

    fn no_params() -> PathParams {
        Ok(HashMap::new())
    }

    fn full_policy(supported_in_standalone: bool) -> RoutePolicy {
        RoutePolicy::authenticated()
            .load_provisioner(PROVISIONER_NAME_PARAM)
            .check_action(supported_in_standalone)
    }

    #[tokio::test]
    async fn disabled_api_rejects_before_any_collaborator_call() {
        let h = harness(BackendKind::Standalone);
        h.authority.enabled.store(false, Ordering::SeqCst);

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &params("acme"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::NotImplemented(_)));
        assert_eq!(err.to_string(), "administration API not enabled");
        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.authority.lookup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn feature_flag_is_read_per_request() {
        let h = harness(BackendKind::Standalone);
        let policy = RoutePolicy::authenticated();

        assert!(h.pipeline.admit(&policy, &request(Some(TOKEN)), &no_params()).await.is_ok());
        h.authority.enabled.store(false, Ordering::SeqCst);
        assert!(h.pipeline.admit(&policy, &request(Some(TOKEN)), &no_params()).await.is_err());
    }

    #[tokio::test]
    async fn missing_or_empty_token_skips_verification() {
        let h = harness(BackendKind::Standalone);

        for parts in [request(None), request(Some(""))] {
            let err = h
                .pipeline
                .admit(&full_policy(true), &parts, &params("acme"))
                .await
                .unwrap_err();
            assert!(matches!(err, AdminError::Unauthorized(_)));
            assert_eq!(err.to_string(), "missing authorization header token");
        }

        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn token_is_verified_once_and_identity_is_attached() {
        let h = harness(BackendKind::Standalone);

        let admitted = h
            .pipeline
            .admit(&RoutePolicy::authenticated(), &request(Some(TOKEN)), &no_params())
            .await
            .unwrap();

        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*h.authority.seen_tokens.lock().unwrap(), vec![TOKEN.to_string()]);
        assert_eq!(admitted.admin(), &h.authority.admin);
        assert!(admitted.provisioner().is_none());
    }

    #[tokio::test]
    async fn verification_error_is_surfaced_unchanged() {
        let h = harness(BackendKind::Standalone);

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some("Bearer stale")), &params("acme"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::Unauthorized(_)));
        assert_eq!(err.to_string(), "token is expired");
        assert_eq!(*h.authority.seen_tokens.lock().unwrap(), vec!["Bearer stale".to_string()]);
        assert_eq!(h.authority.lookup_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_name_never_reaches_the_store() {
        let h = harness(BackendKind::Standalone);

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &params("x"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "internal");
        assert_eq!(err.to_string(), "error loading provisioner x");
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_miss_reports_name_not_id() {
        let h = harness(BackendKind::Standalone);

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &params("orphan"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "internal");
        assert_eq!(err.to_string(), "error retrieving provisioner orphan");
        assert!(!err.to_string().contains("prov-orphan-id"));
        assert_eq!(*h.store.seen_ids.lock().unwrap(), vec!["prov-orphan-id".to_string()]);
    }

    #[tokio::test]
    async fn resolved_record_is_attached() {
        let h = harness(BackendKind::Standalone);

        let admitted = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &params("acme"))
            .await
            .unwrap();

        assert_eq!(admitted.provisioner().map(|p| p.id.as_str()), Some("prov-acme-id"));
        assert_eq!(h.authority.lookup_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capability_truth_table() {
        let cases = [
            (BackendKind::Unsupported, true, Err("operation not supported")),
            (BackendKind::Unsupported, false, Err("operation not supported")),
            (BackendKind::Standalone, true, Ok(())),
            (BackendKind::Standalone, false, Err("operation not supported in standalone mode")),
            (BackendKind::Linked, true, Ok(())),
            (BackendKind::Linked, false, Ok(())),
        ];

        for (kind, supported_in_standalone, expected) in cases {
            let h = harness(kind);
            let got = h.pipeline.check_action(supported_in_standalone);
            match expected {
                Ok(()) => assert!(got.is_ok(), "{kind:?}/{supported_in_standalone} should pass"),
                Err(message) => {
                    let err = got.unwrap_err();
                    assert!(matches!(err, AdminError::NotImplemented(_)));
                    assert_eq!(err.to_string(), message, "{kind:?}/{supported_in_standalone}");
                }
            }
        }
    }

    #[tokio::test]
    async fn unsupported_backend_is_refused_even_for_standalone_routes() {
        let h = harness(BackendKind::Unsupported);

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &params("acme"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "operation not supported");
        // Resolution already ran; the capability gate comes last.
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capability_follows_a_swapped_backend() {
        let h = harness(BackendKind::Standalone);
        let policy = full_policy(false);

        let first = h.pipeline.admit(&policy, &request(Some(TOKEN)), &params("acme")).await;
        assert!(first.is_err());

        h.store.set_kind(BackendKind::Linked);
        let second = h.pipeline.admit(&policy, &request(Some(TOKEN)), &params("acme")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn guards_run_in_fixed_order() {
        let h = harness(BackendKind::Linked);

        h.pipeline
            .admit(&full_policy(false), &request(Some(TOKEN)), &params("acme"))
            .await
            .unwrap();

        assert_eq!(
            *h.observer.states.lock().unwrap(),
            vec![
                AdmissionState::Entered,
                AdmissionState::FeatureChecked,
                AdmissionState::Authenticated,
                AdmissionState::ResourceResolved,
                AdmissionState::CapabilityChecked,
                AdmissionState::Admitted,
            ]
        );
    }

    #[tokio::test]
    async fn rejection_stops_the_chain() {
        let h = harness(BackendKind::Linked);

        let _ = h
            .pipeline
            .admit(&full_policy(false), &request(None), &params("acme"))
            .await;

        assert_eq!(
            *h.observer.states.lock().unwrap(),
            vec![
                AdmissionState::Entered,
                AdmissionState::FeatureChecked,
                AdmissionState::Rejected,
            ]
        );
    }

    #[tokio::test]
    async fn uncomposed_guards_emit_no_transition() {
        let h = harness(BackendKind::Standalone);

        h.pipeline
            .admit(&RoutePolicy::authenticated().check_action(true), &request(Some(TOKEN)), &no_params())
            .await
            .unwrap();

        assert_eq!(h.authority.lookup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *h.observer.states.lock().unwrap(),
            vec![
                AdmissionState::Entered,
                AdmissionState::FeatureChecked,
                AdmissionState::Authenticated,
                AdmissionState::CapabilityChecked,
                AdmissionState::Admitted,
            ]
        );
    }

    #[tokio::test]
    async fn repeated_requests_get_identical_decisions() {
        let h = harness(BackendKind::Linked);
        let policy = full_policy(false);

        let first = h.pipeline.admit(&policy, &request(Some(TOKEN)), &params("acme")).await.unwrap();
        let second = h.pipeline.admit(&policy, &request(Some(TOKEN)), &params("acme")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_ascii_header_is_rejected_without_verification() {
        let h = harness(BackendKind::Standalone);
        let mut parts = request(None);
        parts.headers.insert(
            AUTHORIZATION,
            axum::http::HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );

        let err = h
            .pipeline
            .admit(&full_policy(true), &parts, &params("acme"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::Unauthorized(_)));
        assert_eq!(err.to_string(), "invalid authorization header token");
        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_path_stops_before_name_lookup() {
        let h = harness(BackendKind::Standalone);
        let broken: PathParams = Err("invalid utf-8 in path parameter".to_string());

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(Some(TOKEN)), &broken)
            .await
            .unwrap_err();

        assert_eq!(err.category(), "internal");
        assert_eq!(err.to_string(), "error reading provisioner name");
        let cause = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(cause.as_deref(), Some("invalid utf-8 in path parameter"));
        assert_eq!(h.authority.authorize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.authority.lookup_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_path_still_requires_a_token() {
        let h = harness(BackendKind::Standalone);
        let broken: PathParams = Err("invalid utf-8 in path parameter".to_string());

        let err = h
            .pipeline
            .admit(&full_policy(true), &request(None), &broken)
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::Unauthorized(_)));
    }
}
