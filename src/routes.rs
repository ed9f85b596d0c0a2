use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::Instrument;

use it_worked_image::CONTAINER_DATA_PATH;

use crate::config::ServerConfig;
use crate::context::PageContext;
use crate::page::{Page, SharedImageSource};
use crate::platform::RuntimePlatform;

/// File name looked up inside the data directory.
pub const CONTAINER_FILE: &str = "container.json";

/// Directory the container document is served from.
#[derive(Clone, Debug)]
pub struct DataDir(pub Arc<PathBuf>);

/// Builds the full application: page, static container document and health probe.
pub fn app(config: &ServerConfig, source: SharedImageSource) -> Router {
    Router::new()
        .route("/", get(page))
        .route(CONTAINER_DATA_PATH, get(container_data))
        .route("/healthz", get(health))
        .layer(Extension(source))
        .layer(Extension(DataDir(Arc::new(config.data_dir.clone()))))
        .layer(Extension(config.platform.clone()))
}

async fn page(context: PageContext) -> Response {
    let metadata = context.metadata();
    let span = tracing::info_span!(
        "page",
        method = %metadata.method,
        path = %metadata.path,
        request_id = metadata.request_id.as_deref().unwrap_or("-"),
    );

    async {
        let page = Page::mount(context.source()).await;
        match page.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn container_data(Extension(data_dir): Extension<DataDir>) -> Response {
    let path = data_dir.0.join(CONTAINER_FILE);
    match tokio::fs::read(&path).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "container document not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to read container document");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    platform: &'static str,
}

async fn health(Extension(platform): Extension<RuntimePlatform>) -> Json<Health> {
    Json(Health {
        status: "ok",
        platform: platform.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn data_dir(path: &std::path::Path) -> Extension<DataDir> {
        Extension(DataDir(Arc::new(path.to_path_buf())))
    }

    #[tokio::test]
    async fn serves_container_document_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"image":{"registry":"","namespace":"","repository":"webapp","tag":"latest"}}"#;
        std::fs::write(dir.path().join(CONTAINER_FILE), body).unwrap();

        let response = container_data(data_dir(dir.path())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], body.as_bytes());
    }

    #[tokio::test]
    async fn missing_container_document_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let response = container_data(data_dir(dir.path())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreadable_container_document_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(CONTAINER_FILE)).unwrap();

        let response = container_data(data_dir(dir.path())).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_platform() {
        let Json(generic) = health(Extension(RuntimePlatform::Generic)).await;
        assert_eq!(generic.status, "ok");
        assert_eq!(generic.platform, "generic");

        let pod = RuntimePlatform::Kubernetes(Default::default());
        let Json(kubernetes) = health(Extension(pod)).await;
        assert_eq!(kubernetes.status, "ok");
        assert_eq!(kubernetes.platform, "kubernetes");
    }
}
