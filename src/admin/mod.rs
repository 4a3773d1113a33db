pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::net::ConnectionTracker;

/// Router behind the Admin chain's handler stage, mounted under `admin_root`.
pub fn setup_admin_router(admin_root: &str, tracker: ConnectionTracker) -> Router {
    let root = admin_root.trim_end_matches('/');
    Router::new()
        .route(&format!("{root}/status"), get(get_status))
        .route(&format!("{root}/connections"), get(get_connections))
        .with_state(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn connections_reports_tracker_count() {
        let tracker = ConnectionTracker::new();
        let _guard = tracker.track();
        let router = setup_admin_router("/admin", tracker);

        let response = router
            .oneshot(Request::builder().uri("/admin/connections").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["active"], 1);
    }

    #[tokio::test]
    async fn routes_follow_configured_root() {
        let router = setup_admin_router("/ops", ConnectionTracker::new());

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/ops/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
