use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use lx_core::{
    Credentials, GraphQlRequest, LeanIxClient, LeanIxError, RawResponse, RetryConfig, Transport,
    Url,
};
use lx_reconcile::{
    MaturityGapReconciler, OperationalStatusReconciler, Outcome, ReconcileTask, ReconcileWorker,
    Reconciler, SweepSummary, refresh_all,
};
use serde_json::{Value, json};

/// Answers token requests with a fresh token and GraphQL requests from a script.
#[derive(Default)]
struct ScriptedTransport {
    tokens_issued: Mutex<usize>,
    graphql: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedTransport {
    fn respond(&self, status: u16, body: Value) {
        self.graphql.lock().unwrap().push_back(RawResponse::new(
            status.try_into().unwrap(),
            body.to_string(),
        ));
    }

    fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn tokens_issued(&self) -> usize {
        *self.tokens_issued.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request_token(&self, _url: Url, _api_token: &str) -> Result<RawResponse, LeanIxError> {
        *self.tokens_issued.lock().unwrap() += 1;
        let token = encode(
            &Header::default(),
            &json!({ "exp": 4_102_444_800_i64, "instanceUrl": "https://demo-eu.leanix.net" }),
            &EncodingKey::from_secret(b"scripted"),
        )
        .unwrap();
        Ok(RawResponse::new(
            200u16.try_into().unwrap(),
            json!({ "access_token": token, "token_type": "bearer", "expires_in": 3599 }).to_string(),
        ))
    }

    async fn post_graphql(
        &self,
        _url: Url,
        _access_token: &str,
        request: &GraphQlRequest,
    ) -> Result<RawResponse, LeanIxError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .graphql
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected graphql request"))
    }
}

async fn client(transport: Arc<ScriptedTransport>) -> Arc<LeanIxClient<ScriptedTransport>> {
    let client = LeanIxClient::with_shared_transport(
        Credentials::new("demo.leanix.net", "api-token"),
        transport,
        RetryConfig::NONE,
    );
    client.authenticate().await.unwrap();
    Arc::new(client)
}

fn application(id: &str, lifecycle: Option<&str>, status: Option<&str>) -> Value {
    json!({
        "id": id,
        "type": "Application",
        "rev": 7,
        "name": format!("App {id}"),
        "lifecycle": lifecycle.map(|phase| json!({ "asString": phase })),
        "mbgAppOperationalStatus": status
    })
}

#[tokio::test]
async fn end_of_life_application_is_deprecated_with_rev() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client(transport.clone()).await;
    transport.respond(
        200,
        json!({ "data": { "factSheet": application("app-1", Some("endOfLife"), Some("operational")) } }),
    );
    transport.respond(200, json!({ "data": { "updateFactSheet": { "factSheet": { "id": "app-1" } } } }));

    let reconciler = Arc::new(OperationalStatusReconciler::new(client.clone()));
    let worker = ReconcileWorker::new(client, reconciler);
    let outcome = worker.reconcile(&ReconcileTask::new("app-1")).await.unwrap();
    assert_eq!(outcome, Outcome::Updated);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].variables, Some(json!({ "factSheetId": "app-1" })));
    let mutation = requests[1].variables.clone().unwrap();
    assert_eq!(mutation["rev"], 7);
    assert_eq!(
        mutation["patches"],
        json!([{ "op": "replace", "path": "/mbgAppOperationalStatus", "value": "deprecated" }])
    );
}

#[tokio::test]
async fn rejected_token_triggers_one_reauthentication() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client(transport.clone()).await;
    transport.respond(401, json!({}));
    transport.respond(
        200,
        json!({ "data": { "factSheet": application("app-1", Some("active"), Some("operational")) } }),
    );

    let reconciler = Arc::new(OperationalStatusReconciler::new(client.clone()));
    let worker = ReconcileWorker::new(client, reconciler);
    let outcome = worker.reconcile(&ReconcileTask::new("app-1")).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(transport.tokens_issued(), 2);
}

#[tokio::test]
async fn wrong_fact_sheet_type_is_not_found() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client(transport.clone()).await;
    transport.respond(200, json!({ "data": { "factSheet": { "id": "bc-1", "type": "BusinessCapability" } } }));

    let reconciler = OperationalStatusReconciler::new(client);
    assert_eq!(reconciler.fetch("bc-1").await.unwrap(), None);
}

#[tokio::test]
async fn graphql_errors_fail_the_fetch() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client(transport.clone()).await;
    transport.respond(
        200,
        json!({ "data": null, "errors": [{ "message": "Access denied", "locations": [] }] }),
    );

    let reconciler = MaturityGapReconciler::new(client);
    let err = reconciler.fetch("bc-1").await.unwrap_err();
    assert_eq!(err.to_string(), "graphql request failed: Access denied");
}

#[tokio::test]
async fn maturity_gap_sweep_walks_every_page() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client(transport.clone()).await;
    transport.respond(
        200,
        json!({ "data": { "allFactSheets": {
            "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
            "edges": [{ "node": {
                "id": "bc-1", "type": "BusinessCapability", "name": "Billing",
                "currentMaturity": "defined", "targetMaturity": "adhoc", "maturityGap": null
            } }]
        } } }),
    );
    transport.respond(
        200,
        json!({ "data": { "allFactSheets": {
            "pageInfo": { "hasNextPage": false, "endCursor": "c2" },
            "edges": [{ "node": {
                "id": "bc-2", "type": "BusinessCapability", "name": "Payments",
                "currentMaturity": "managed", "targetMaturity": "managed", "maturityGap": "aligned"
            } }]
        } } }),
    );
    transport.respond(200, json!({ "data": { "updateFactSheet": { "factSheet": { "id": "bc-1" } } } }));

    let reconciler = MaturityGapReconciler::new(client.clone());
    let summary = refresh_all(&*client, &reconciler).await.unwrap();
    assert_eq!(
        summary,
        SweepSummary {
            scanned: 2,
            updated: 1,
            failed: 0
        }
    );

    let requests = transport.requests();
    assert_eq!(requests[0].variables, Some(json!({ "first": 5000, "after": null })));
    assert_eq!(requests[1].variables, Some(json!({ "first": 5000, "after": "c1" })));
    assert_eq!(
        requests[2].variables,
        Some(json!({
            "id": "bc-1",
            "patches": [{ "op": "replace", "path": "/maturityGap", "value": "medium" }]
        }))
    );
    assert_eq!(transport.tokens_issued(), 1);
}
