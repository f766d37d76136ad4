use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use log::info;
use maillist_server_app::{
    Application,
    workflow::subscriber::{
        add::AddSubscriberError, get::GetSubscriberError, list::ListSubscribersError,
        lookup::LookupRemoteStatusError, remove::RemoveSubscriberError,
    },
};

mod subscribers;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

pub async fn run(
    app: Arc<Application>,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) {
    let router: Router<AppState> = Router::new().nest(
        "/v1",
        Router::new()
            .route(
                "/subscribers",
                get(subscribers::get_all).post(subscribers::add),
            )
            .route(
                "/subscribers/{email}",
                get(subscribers::get_by_email).delete(subscribers::remove),
            )
            .route(
                "/subscribers/{email}/remote",
                get(subscribers::get_remote_status),
            ),
    );

    let port = std::env::var("MAILLIST_HTTP_PORT")
        .expect("MAILLIST_HTTP_PORT must be set")
        .parse::<u16>()
        .expect("MAILLIST_HTTP_PORT must be a valid u16");

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .unwrap();

    info!("API server listening on port {}", port);
    axum::serve(listener, router.with_state(AppState { app }))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .unwrap();

    info!("HTTP API shut down gracefully");
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "status": "failed", "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

impl From<AddSubscriberError> for ApiError {
    fn from(value: AddSubscriberError) -> Self {
        let status = match &value {
            AddSubscriberError::InvalidEmail(..) => StatusCode::BAD_REQUEST,
            AddSubscriberError::Storage(..)
            | AddSubscriberError::Remote(..)
            // The mismatch message is deliberately kept distinct from plain
            // remote failures so operators can tell divergence apart.
            | AddSubscriberError::Inconsistent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: value.to_string(),
        }
    }
}

impl From<RemoveSubscriberError> for ApiError {
    fn from(value: RemoveSubscriberError) -> Self {
        let status = match &value {
            RemoveSubscriberError::NotFound(..) => StatusCode::NOT_FOUND,
            RemoveSubscriberError::Storage(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: value.to_string(),
        }
    }
}

impl From<GetSubscriberError> for ApiError {
    fn from(value: GetSubscriberError) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<ListSubscribersError> for ApiError {
    fn from(value: ListSubscribersError) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<LookupRemoteStatusError> for ApiError {
    fn from(value: LookupRemoteStatusError) -> Self {
        let status = match &value {
            LookupRemoteStatusError::InvalidEmail(..) => StatusCode::BAD_REQUEST,
            LookupRemoteStatusError::Remote(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: value.to_string(),
        }
    }
}
