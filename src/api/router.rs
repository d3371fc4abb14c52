use axum::{middleware, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::{logging_middleware, metrics_middleware};
use super::state::AppState;
use super::v1;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Account holder API
        .nest("/v1", v1::create_v1_router())
        // Admin API
        .nest("/admin", admin::create_admin_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Create the router plus the Prometheus endpoint when metrics are enabled
pub fn create_router_with_metrics(
    state: AppState,
    metrics: Option<PrometheusMetrics>,
    metrics_path: &str,
) -> Router {
    let router = create_router(state);

    match metrics {
        Some(m) => router.merge(create_metrics_router(m, metrics_path)),
        None => router,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::account::{Account, AccountId, PlanTier};
    use crate::domain::ledger::{LedgerEntry, LedgerStore};
    use crate::domain::llm::{LlmProvider, LlmResponse, Message, MockLlmProvider, Usage};
    use crate::domain::pix::PixCodeEncoder;
    use crate::infrastructure::ledger::InMemoryLedgerStore;
    use crate::infrastructure::recharge::{InMemoryRechargeRepository, RechargeService};
    use crate::infrastructure::usage::{MeteringConfig, UsageMeteringService};

    const ADMIN_KEY: &str = "admin-secret";
    const PAYEE_KEY: &str = "02976592438";

    struct TestApp {
        router: Router,
        ledger: Arc<InMemoryLedgerStore>,
    }

    fn answering_provider() -> MockLlmProvider {
        let mut provider = MockLlmProvider::new();
        provider.expect_chat().returning(|_, _| {
            Ok(LlmResponse::new(
                "resp-1".to_string(),
                "gpt-4o-mini".to_string(),
                Message::assistant("Here you go"),
            )
            .with_usage(Usage::new(1000, 500)))
        });
        provider.expect_provider_name().return_const("mock");
        provider
    }

    fn test_app(provider: Option<MockLlmProvider>) -> TestApp {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let provider = provider.map(|p| Arc::new(p) as Arc<dyn LlmProvider>);
        let encoder = PixCodeEncoder::new(PAYEE_KEY);

        let metering =
            UsageMeteringService::new(ledger.clone(), provider, MeteringConfig::default());
        let recharges =
            RechargeService::new(Arc::new(InMemoryRechargeRepository::new()), ledger.clone())
                .with_encoder(encoder.clone());

        let state = AppState::new(ledger.clone(), Arc::new(metering), Arc::new(recharges))
            .with_pix_encoder(encoder)
            .with_admin_api_key(ADMIN_KEY);

        TestApp {
            router: create_router(state),
            ledger,
        }
    }

    async fn seed(ledger: &InMemoryLedgerStore, id: &str, tier: PlanTier, balance: Decimal) {
        let id = AccountId::new(id).unwrap();
        ledger.open_account(Account::open(id.clone(), tier)).await.unwrap();

        if balance > Decimal::ZERO {
            ledger
                .credit_and_log(&id, LedgerEntry::credit(balance, "seed"))
                .await
                .unwrap();
        }
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-key", ADMIN_KEY)
            .header("content-type", "application/json");

        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, body)
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    fn interaction(account_id: &str, mode: &str) -> Request<Body> {
        json_request(
            Method::POST,
            "/v1/interactions",
            json!({ "accountId": account_id, "mode": mode, "promptText": "Explain fractions" }),
        )
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = test_app(None);

        let (status, body) = send(
            &app.router,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(
            &app.router,
            Request::get("/ready").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"][0]["name"], "ledger");
    }

    #[tokio::test]
    async fn test_interaction_charges_account() {
        let app = test_app(Some(answering_provider()));
        seed(&app.ledger, "student-1", PlanTier::Advanced, dec!(10.00)).await;

        let (status, body) = send(&app.router, interaction("student-1", "chat")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "Here you go");
        assert_eq!(decimal(&body["cost"]), dec!(0.001485));
        assert_eq!(decimal(&body["remainingBalance"]), dec!(9.998515));
        assert_eq!(body["tokensIn"], 1000);
        assert_eq!(body["tokensOut"], 500);

        let (status, body) = send(
            &app.router,
            Request::get("/v1/accounts/student-1/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["transactions"][1]["kind"], "debit");
        assert_eq!(body["transactions"][1]["tokensUsed"], 1500);
    }

    #[tokio::test]
    async fn test_interaction_error_statuses() {
        let app = test_app(Some(answering_provider()));
        seed(&app.ledger, "basic-1", PlanTier::Basic, dec!(10.00)).await;
        seed(&app.ledger, "broke-1", PlanTier::Advanced, dec!(0.05)).await;

        let missing_account = json_request(
            Method::POST,
            "/v1/interactions",
            json!({ "mode": "chat", "promptText": "hi" }),
        );
        let (status, _) = send(&app.router, missing_account).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app.router, interaction("ghost", "chat")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app.router, interaction("basic-1", "explanation")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "plan_not_allowed");

        let (status, body) = send(&app.router, interaction("broke-1", "chat")).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["error"]["code"], "insufficient_balance");

        let wrong_method = Request::get("/v1/interactions").body(Body::empty()).unwrap();
        let (status, _) = send(&app.router, wrong_method).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_account_id_from_header() {
        let app = test_app(Some(answering_provider()));
        seed(&app.ledger, "student-2", PlanTier::Admin, dec!(1.00)).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/interactions")
            .header("content-type", "application/json")
            .header("x-account-id", "student-2")
            .body(Body::from(
                json!({ "mode": "explanation", "promptText": "Why?" }).to_string(),
            ))
            .unwrap();

        let (status, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_provider_hides_details() {
        let app = test_app(None);
        seed(&app.ledger, "student-1", PlanTier::Advanced, dec!(10.00)).await;

        let (status, body) = send(&app.router, interaction("student-1", "chat")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.to_lowercase().contains("provider"));
    }

    #[tokio::test]
    async fn test_admin_requires_key() {
        let app = test_app(None);

        let no_key = json_request(
            Method::POST,
            "/admin/accounts",
            json!({ "accountId": "acc-1", "planTier": "basic" }),
        );
        let (status, _) = send(&app.router, no_key).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let wrong_key = Request::builder()
            .method(Method::GET)
            .uri("/admin/recharges")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app.router, wrong_key).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_account_management() {
        let app = test_app(None);

        let open = admin_request(
            Method::POST,
            "/admin/accounts",
            Some(json!({ "accountId": "acc-1", "planTier": "intermediate" })),
        );
        let (status, body) = send(&app.router, open).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["planTier"], "intermediate");
        assert_eq!(decimal(&body["balance"]), Decimal::ZERO);

        let duplicate = admin_request(
            Method::POST,
            "/admin/accounts",
            Some(json!({ "accountId": "acc-1", "planTier": "basic" })),
        );
        let (status, _) = send(&app.router, duplicate).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let upgrade = admin_request(
            Method::PUT,
            "/admin/accounts/acc-1/plan",
            Some(json!({ "planTier": "advanced" })),
        );
        let (status, body) = send(&app.router, upgrade).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["planTier"], "advanced");

        let reconcile = admin_request(Method::GET, "/admin/accounts/acc-1/reconcile", None);
        let (status, body) = send(&app.router, reconcile).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["consistent"], true);
        assert_eq!(body["transactionCount"], 0);
    }

    #[tokio::test]
    async fn test_recharge_flow_credits_once() {
        let app = test_app(None);
        seed(&app.ledger, "acc-1", PlanTier::Basic, Decimal::ZERO).await;

        let create = json_request(
            Method::POST,
            "/v1/recharges",
            json!({
                "accountId": "acc-1",
                "payerDisplayName": "Maria Souza",
                "amount": "20.00",
                "creditKind": "currency_balance"
            }),
        );
        let (status, body) = send(&app.router, create).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["request"]["status"], "pending");
        let payload = body["pixPayload"].as_str().unwrap();
        assert!(payload.contains("540520.00"));
        let request_id = body["request"]["id"].as_str().unwrap().to_string();

        let resolve_uri = format!("/admin/recharges/{}/resolve", request_id);
        for expected in ["resolved", "already_resolved"] {
            let approve = admin_request(
                Method::POST,
                &resolve_uri,
                Some(json!({ "decision": "approved" })),
            );
            let (status, body) = send(&app.router, approve).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["outcome"], expected);
            assert_eq!(body["request"]["status"], "approved");
        }

        let reject = admin_request(
            Method::POST,
            &resolve_uri,
            Some(json!({ "decision": "rejected" })),
        );
        let (_, body) = send(&app.router, reject).await;
        assert_eq!(body["outcome"], "already_resolved");
        assert_eq!(body["request"]["status"], "approved");

        let (status, body) = send(
            &app.router,
            Request::get("/v1/accounts/acc-1/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&body["balance"]), dec!(20.00));

        let listing = admin_request(Method::GET, "/admin/recharges?status=approved", None);
        let (status, body) = send(&app.router, listing).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let own = Request::get("/v1/accounts/acc-1/recharges")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app.router, own).await;
        assert_eq!(body["requests"][0]["id"], request_id.as_str());
    }

    #[tokio::test]
    async fn test_recharge_validation() {
        let app = test_app(None);
        seed(&app.ledger, "acc-1", PlanTier::Basic, Decimal::ZERO).await;

        let bad_amount = json_request(
            Method::POST,
            "/v1/recharges",
            json!({ "accountId": "acc-1", "payerDisplayName": "Maria", "amount": "10.005" }),
        );
        let (status, body) = send(&app.router, bad_amount).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_amount");

        let unknown_account = json_request(
            Method::POST,
            "/v1/recharges",
            json!({ "accountId": "ghost", "payerDisplayName": "Maria", "amount": "10.00" }),
        );
        let (status, _) = send(&app.router, unknown_account).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let missing = admin_request(
            Method::POST,
            "/admin/recharges/rch-missing/resolve",
            Some(json!({ "decision": "approved" })),
        );
        let (status, _) = send(&app.router, missing).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pix_payload_endpoint() {
        let app = test_app(None);

        let (status, body) = send(
            &app.router,
            json_request(Method::POST, "/v1/pix/payload", json!({ "amount": "20.00" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amount"], "20.00");
        assert_eq!(
            body["payload"],
            "00020126330014BR.GOV.BCB.PIX011102976592438520400005303986540520.00\
             5802BR5901N6001C62070503***63041F22"
        );

        for amount in ["0", "-1.00", "1.234"] {
            let (status, _) = send(
                &app.router,
                json_request(Method::POST, "/v1/pix/payload", json!({ "amount": amount })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app(None);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/pix/payload")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_json");
    }
}
