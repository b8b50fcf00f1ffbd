use super::*;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use crate::pagination::{ListEvent, ListView};
use shared::domain::{Coordinate, DeliveryId, DeliveryStatus, PackageId};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    created_packages: Arc<Mutex<Vec<CreatePackageRequest>>>,
    created_deliveries: Arc<Mutex<Vec<CreateDeliveryRequest>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

pub(crate) fn sample_package(n: u32) -> Package {
    Package {
        package_id: PackageId(format!("pkg-{n}")),
        description: format!("Package {n}"),
        weight: 1200.0,
        width: 20.0,
        height: 10.0,
        depth: 5.0,
        from_name: "Warehouse".to_string(),
        from_address: "1 Dock Road".to_string(),
        from_location: Coordinate::new(51.5, -0.09),
        to_name: "Alice".to_string(),
        to_address: "2 High Street".to_string(),
        to_location: Coordinate::new(51.51, -0.1),
        active_delivery: None,
    }
}

fn packages() -> Vec<Package> {
    (1..=9).map(sample_package).collect()
}

fn state_from(query: &HashMap<String, String>) -> PaginationState {
    let page = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let limit = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(4);
    PaginationState::new(page, limit)
}

async fn list_packages(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> axum::response::Response {
    state.queries.lock().await.push(query.clone());
    if query.get("paginate").map(String::as_str) == Some("true") {
        Json(PaginatedResult::from_items(&packages(), state_from(&query))).into_response()
    } else {
        Json(packages()).into_response()
    }
}

async fn create_package(
    State(state): State<ServerState>,
    Json(payload): Json<CreatePackageRequest>,
) -> impl IntoResponse {
    state.created_packages.lock().await.push(payload);
    (StatusCode::CREATED, "")
}

async fn list_deliveries(
    Query(query): Query<HashMap<String, String>>,
) -> Json<PaginatedResult<serde_json::Value>> {
    let delivery = serde_json::json!({
        "_id": "dlv-1",
        "package": sample_package(1),
        "pickup_time": "2024-03-01T10:00:00Z",
        "location": { "lat": "51.5", "lng": "-0.09" },
        "status": "in-transit"
    });
    Json(PaginatedResult::from_items(&[delivery], state_from(&query)))
}

async fn create_delivery(
    State(state): State<ServerState>,
    Json(payload): Json<CreateDeliveryRequest>,
) -> axum::response::Response {
    if payload.package_id.0 == "busy" {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "message": "package already has an active delivery" })),
        )
            .into_response();
    }
    if payload.package_id.0 == "down" {
        return (StatusCode::BAD_GATEWAY, "upstream down").into_response();
    }
    state.created_deliveries.lock().await.push(payload);
    Json(serde_json::json!({ "_id": "dlv-2" })).into_response()
}

async fn spawn_admin_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/package", get(list_packages).post(create_package))
        .route("/api/delivery", get(list_deliveries).post(create_delivery))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[test]
fn endpoint_joins_resource_path_under_base_path() {
    let client = AdminClient::new("http://localhost:3000/admin").expect("client");
    assert_eq!(
        client.endpoint(Resource::Delivery).expect("url").as_str(),
        "http://localhost:3000/admin/api/delivery"
    );
    assert!(AdminClient::new("not a url").is_err());
}

#[tokio::test]
async fn list_packages_sends_pagination_query() {
    let (server_url, server) = spawn_admin_server().await.expect("spawn server");
    let client = AdminClient::new(&server_url).expect("client");

    let page = client
        .list_packages(PaginationState::new(3, 4))
        .await
        .expect("list");
    assert_eq!(page.page, 3);
    assert_eq!(page.pages, 3);
    assert_eq!(page.total, 9);
    assert_eq!(page.docs.len(), 1);
    assert_eq!(page.docs[0].package_id, PackageId::from("pkg-9"));

    let queries = server.queries.lock().await;
    let query = queries.last().expect("query");
    assert_eq!(query.get("paginate").map(String::as_str), Some("true"));
    assert_eq!(query.get("page").map(String::as_str), Some("3"));
    assert_eq!(query.get("limit").map(String::as_str), Some("4"));
}

#[tokio::test]
async fn all_packages_reads_unpaginated_array() {
    let (server_url, _server) = spawn_admin_server().await.expect("spawn server");
    let client = AdminClient::new(&server_url).expect("client");
    let all = client.all_packages().await.expect("all");
    assert_eq!(all.len(), 9);
}

#[tokio::test]
async fn list_deliveries_decodes_string_coordinates_and_status() {
    let (server_url, _server) = spawn_admin_server().await.expect("spawn server");
    let client = AdminClient::new(&server_url).expect("client");
    let page = client
        .list_deliveries(PaginationState::default())
        .await
        .expect("list");
    let delivery = &page.docs[0];
    assert_eq!(delivery.delivery_id, DeliveryId::from("dlv-1"));
    assert_eq!(delivery.status, DeliveryStatus::InTransit);
    assert_eq!(delivery.location, Coordinate::new(51.5, -0.09));
    assert!(delivery.pickup_time.is_some());
    assert!(delivery.end_time.is_none());
}

#[tokio::test]
async fn create_package_tolerates_empty_success_body() {
    let (server_url, server) = spawn_admin_server().await.expect("spawn server");
    let client = AdminClient::new(&server_url).expect("client");
    let package = sample_package(1);
    let request = CreatePackageRequest {
        description: package.description,
        weight: package.weight,
        width: package.width,
        height: package.height,
        depth: package.depth,
        from_name: package.from_name,
        from_address: package.from_address,
        from_location: package.from_location,
        to_name: package.to_name,
        to_address: package.to_address,
        to_location: package.to_location,
    };

    let created = client.create_package(&request).await.expect("create");
    assert!(created.is_none());
    assert_eq!(server.created_packages.lock().await.as_slice(), &[request]);
}

#[tokio::test]
async fn create_delivery_surfaces_structured_and_plain_errors() {
    let (server_url, server) = spawn_admin_server().await.expect("spawn server");
    let client = AdminClient::new(&server_url).expect("client");

    let created = client
        .create_delivery(&CreateDeliveryRequest {
            package_id: PackageId::from("pkg-1"),
        })
        .await
        .expect("create");
    assert_eq!(created, Some(serde_json::json!({ "_id": "dlv-2" })));
    assert_eq!(server.created_deliveries.lock().await.len(), 1);

    let err = client
        .create_delivery(&CreateDeliveryRequest {
            package_id: PackageId::from("busy"),
        })
        .await
        .expect_err("conflict");
    match &err {
        ClientError::Api { status, body } => {
            assert_eq!(*status, 409);
            assert_eq!(body.message, "package already has an active delivery");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.alert_message(), "package already has an active delivery");

    let err = client
        .create_delivery(&CreateDeliveryRequest {
            package_id: PackageId::from("down"),
        })
        .await
        .expect_err("bad gateway");
    assert!(err.to_string().contains("upstream down"));
}

#[tokio::test]
async fn paginated_list_walks_remote_pages() {
    let (server_url, _server) = spawn_admin_server().await.expect("spawn server");
    let client = Arc::new(AdminClient::new(&server_url).expect("client"));
    let list = PaginatedList::new(Arc::new(RemoteCollection::packages(client)), 4);
    let mut events = list.subscribe();

    list.mount().await.expect("mount").await.expect("join");
    list.next_page()
        .await
        .expect("next")
        .expect("task")
        .await
        .expect("join");

    assert_eq!(
        events.recv().await.expect("event"),
        ListEvent::Applied { seq: 1, page: 1 }
    );
    assert_eq!(
        events.recv().await.expect("event"),
        ListEvent::Applied { seq: 2, page: 2 }
    );
    let descriptions = list
        .with_view(|controller| match controller.view() {
            ListView::Loaded { result } => result
                .docs
                .iter()
                .map(|package| package.description.clone())
                .collect::<Vec<_>>(),
            _ => Vec::new(),
        })
        .await;
    assert_eq!(
        descriptions,
        vec!["Package 5", "Package 6", "Package 7", "Package 8"]
    );
}

#[tokio::test]
async fn paginated_list_reports_unreachable_server() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let client = Arc::new(AdminClient::new("http://127.0.0.1:9").expect("client"));
    let list = PaginatedList::new(Arc::new(RemoteCollection::deliveries(client)), 4);
    list.mount().await.expect("mount").await.expect("join");
    let failed = list
        .with_view(|controller| matches!(controller.view(), ListView::Failed { .. }))
        .await;
    assert!(failed);
}
