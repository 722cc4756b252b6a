use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use dept_checkout::engine::validator::RequestDraft;
use dept_checkout::models::policy::PolicyTable;
use dept_checkout::models::request::{Priority, RequestTransition, TransitionError};
use dept_checkout::models::user::Role;
use dept_checkout::session::SessionError;
use dept_checkout::{AppError, AppState, Config};

type Posted = Arc<Mutex<Vec<(String, Value)>>>;

fn jwt(role: &str) -> String {
    let claims = json!({
        "userId": "u7",
        "email": "sam@uni.edu",
        "name": "Sam",
        "role": role,
        "exp": Utc::now().timestamp() + 3600,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"backend")).unwrap()
}

async fn record(State(posted): State<Posted>, Path(id): Path<String>, Json(body): Json<Value>) -> StatusCode {
    posted.lock().unwrap().push((id, body));
    StatusCode::NO_CONTENT
}

async fn record_new(State(posted): State<Posted>, Json(body): Json<Value>) -> Json<Value> {
    posted.lock().unwrap().push(("new".to_string(), body));
    Json(json!({ "_id": "r99", "status": "pending" }))
}

async fn backend(role: &'static str, posted: Posted) -> String {
    let app = Router::new()
        .route("/login", post(move || async move { Json(json!({ "token": jwt(role) })) }))
        .route(
            "/requests",
            get(|| async {
                Json(json!([
                    { "_id": "r1", "status": "pending", "quantity": 1, "createdAt": "2024-05-01T00:00:00Z" },
                    { "_id": "r2", "status": "approved", "quantity": 1, "returnDate": "2099-01-01",
                      "createdAt": "2024-05-02T00:00:00Z" }
                ]))
            })
            .post(record_new),
        )
        .route("/requests/{id}", put(record))
        .route(
            "/resources",
            get(|| async {
                Json(json!([
                    { "_id": "res1", "name": "Tripod", "description": "Carbon", "category": "Media",
                      "quantity": 5, "availableQuantity": 2, "status": "available" }
                ]))
            }),
        )
        .route(
            "/stakeholder-policies",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "maintenance" }))) }),
        )
        .with_state(posted);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(api_url: String, dir: &tempfile::TempDir) -> Arc<Config> {
    Arc::new(Config {
        api_url,
        token_path: dir.path().join("token"),
        poll_interval: Duration::from_secs(30),
        policy_ttl: Duration::from_secs(600),
        http_timeout: Duration::from_secs(5),
        log_dir: dir.path().join("logs"),
    })
}

#[tokio::test]
async fn login_restores_across_runs_and_logout_clears() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(backend("faculty", Posted::default()).await, &dir);

    let mut state = AppState::new(config.clone()).unwrap();
    assert!(matches!(state.require_session(), Err(SessionError::Missing)));
    assert_eq!(state.role(), Role::Unknown);

    let session = assert_ok!(state.login(" sam@uni.edu ", "pw").await);
    assert_eq!(session.role(), Role::Faculty);
    assert!(config.token_path.exists());

    let restored = AppState::new(config.clone()).unwrap();
    assert_eq!(restored.require_session().unwrap().user_id(), "u7");
    assert!(restored.client.has_token());

    state.logout().unwrap();
    assert!(!config.token_path.exists());
    assert_err!(state.require_session());
    assert!(!state.client.has_token());
}

#[tokio::test]
async fn transitions_are_checked_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let posted = Posted::default();
    let mut state = AppState::new(config(backend("student", posted.clone()).await, &dir)).unwrap();
    state.login("sam@uni.edu", "pw").await.unwrap();

    let err = state.apply_transition("r1", &RequestTransition::Approve).await.unwrap_err();
    assert!(matches!(err, AppError::Transition(TransitionError::AdminOnly(_))));

    let err = state.apply_transition("r1", &RequestTransition::RequestReturn).await.unwrap_err();
    assert!(matches!(err, AppError::Transition(TransitionError::IllegalTransition { .. })));

    let err = state.apply_transition("nope", &RequestTransition::RequestReturn).await.unwrap_err();
    assert!(matches!(err, AppError::RequestNotFound(id) if id == "nope"));
    assert!(posted.lock().unwrap().is_empty());

    let refreshed = state.apply_transition("r2", &RequestTransition::RequestReturn).await.unwrap();
    assert_eq!(refreshed.len(), 2);
    assert_eq!(
        posted.lock().unwrap().as_slice(),
        [("r2".to_string(), json!({ "status": "return_requested" }))]
    );
}

#[tokio::test]
async fn submission_is_validated_against_fallback_policy() {
    let dir = tempfile::tempdir().unwrap();
    let posted = Posted::default();
    let mut state = AppState::new(config(backend("student", posted.clone()).await, &dir)).unwrap();
    state.login("sam@uni.edu", "pw").await.unwrap();

    let resource = state.find_resource("res1").await.unwrap();
    let policy = state.resolve_policy(Some(&resource)).await;
    // backend policies unavailable: student defaults, clamped to the 2 available units
    assert_eq!((policy.max_duration, policy.max_quantity), (30, Some(2)));

    let mut draft = RequestDraft::for_policy(&policy);
    assert_eq!((draft.quantity, draft.duration, draft.priority), (1, 7, Priority::Standard));

    draft.quantity = 3;
    draft.priority = Priority::Urgent;
    let err = state.submit_request(&resource, &draft).await.unwrap_err();
    let AppError::Invalid(errors) = err else {
        panic!("expected field errors, got {err:?}");
    };
    assert_eq!(errors.quantity.as_deref(), Some("Only 2 units available"));
    assert!(errors.priority.is_some());
    assert!(posted.lock().unwrap().is_empty());

    draft.quantity = 2;
    draft.priority = Priority::Standard;
    draft.notes = "  field trip  ".into();
    assert_ok!(state.submit_request(&resource, &draft).await);

    let posted = posted.lock().unwrap();
    let (_, body) = &posted[0];
    assert_eq!(body["resourceId"], "res1");
    assert_eq!(body["quantity"], 2);
    assert_eq!(body["notes"], "field trip");
    assert_eq!(body["userRole"], "student");
}

#[tokio::test]
async fn admin_only_operations_are_refused_locally() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = AppState::new(config(backend("student", Posted::default()).await, &dir)).unwrap();
    state.login("sam@uni.edu", "pw").await.unwrap();

    assert!(matches!(
        state.update_policies(PolicyTable::builtin()).await,
        Err(AppError::AdminOnly(_))
    ));
    assert!(matches!(state.user_directory().await, Err(AppError::AdminOnly(_))));
    assert!(matches!(state.delete_resource("res1").await, Err(AppError::AdminOnly(_))));
}

type Hits = Arc<Mutex<Vec<&'static str>>>;

async fn counting_backend(hits: Hits) -> String {
    fn hit(hits: &Hits, path: &'static str) {
        hits.lock().unwrap().push(path);
    }

    let app = Router::new()
        .route("/login", post(|| async { Json(json!({ "token": jwt("admin") })) }))
        .route(
            "/resources",
            get(|State(hits): State<Hits>| async move {
                hit(&hits, "/resources");
                Json(json!([{ "_id": "res1", "name": "Tripod", "quantity": 1, "status": "available" }]))
            }),
        )
        .route(
            "/requests",
            get(|State(hits): State<Hits>| async move {
                hit(&hits, "/requests");
                Json(json!([
                    { "_id": "r1", "status": "pending", "quantity": 1 },
                    { "_id": "r2", "status": "approved", "quantity": 1, "returnDate": "2000-01-01" }
                ]))
            }),
        )
        .route(
            "/due-returns",
            get(|State(hits): State<Hits>| async move {
                hit(&hits, "/due-returns");
                // lapsed since the backend listed it
                Json(json!([
                    { "_id": "r2", "status": "approved", "quantity": 1, "returnDate": "2000-01-01",
                      "daysUntilDue": 1 }
                ]))
            }),
        )
        .route(
            "/overdue-returns",
            get(|State(hits): State<Hits>| async move {
                hit(&hits, "/overdue-returns");
                Json(json!([]))
            }),
        )
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn overview_fetches_each_collection_once() {
    let dir = tempfile::tempdir().unwrap();
    let hits = Hits::default();
    let mut state = AppState::new(config(counting_backend(hits.clone()).await, &dir)).unwrap();
    state.login("sam@uni.edu", "pw").await.unwrap();

    let overview = assert_ok!(state.overview().await);

    let mut seen = hits.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, ["/due-returns", "/overdue-returns", "/requests", "/resources"]);

    assert_eq!(overview.resources.len(), 1);
    assert_eq!(overview.requests.len(), 2);
    assert_eq!(overview.stats.total_resources, 1);
    assert_eq!(overview.stats.pending, 1);
    assert!(overview.report.due.is_empty());
    assert_eq!(overview.report.overdue.len(), 1);
    assert_eq!(overview.report.overdue[0].request.id, "r2");
}
