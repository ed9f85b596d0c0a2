use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::page::{ImageSource, SharedImageSource};

/// Header commonly set by ingress controllers and meshes to correlate requests.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped handle that exposes request metadata plus the shared image source.
#[derive(Clone)]
pub struct PageContext {
    metadata: RequestMetadata,
    source: SharedImageSource,
}

impl PageContext {
    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    /// Returns the source every mount fetches its container document from.
    pub fn source(&self) -> &dyn ImageSource {
        self.source.as_ref()
    }
}

/// Metadata recorded on the page span.
#[derive(Clone, Debug)]
pub struct RequestMetadata {
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
}

impl RequestMetadata {
    fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_owned());
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        Self {
            request_id,
            method: parts.method.to_string(),
            path,
        }
    }
}

/// Errors emitted when a handler requests [`PageContext`] but extensions were not set up.
#[derive(Debug, Error)]
pub enum PageContextRejection {
    #[error("image source missing from request extensions")]
    MissingImageSource,
}

impl IntoResponse for PageContextRejection {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = PageContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let source = parts
            .extensions
            .get::<SharedImageSource>()
            .cloned()
            .ok_or(PageContextRejection::MissingImageSource)?;

        Ok(Self {
            metadata: RequestMetadata::from_parts(parts),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::sync::Arc;

    use crate::page::tests::StubSource;

    #[test]
    fn metadata_reads_request_line_and_id() {
        let request = Request::builder()
            .method("GET")
            .uri("https://example.com/?from=probe")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(())
            .unwrap();

        let (parts, _) = request.into_parts();
        let metadata = RequestMetadata::from_parts(&parts);

        assert_eq!(metadata.request_id.as_deref(), Some("req-42"));
        assert_eq!(metadata.method, "GET");
        assert_eq!(metadata.path, "/?from=probe");
    }

    #[tokio::test]
    async fn extracts_source_from_extensions() {
        let source: SharedImageSource = Arc::new(StubSource::failing());
        let request = Request::builder()
            .uri("/")
            .extension(source)
            .body(())
            .unwrap();

        let (mut parts, _) = request.into_parts();
        let context = PageContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(context.metadata().request_id.is_none());
        assert_eq!(context.metadata().path, "/");
    }

    #[tokio::test]
    async fn rejects_missing_source() {
        let request = Request::builder().uri("/").body(()).unwrap();

        let (mut parts, _) = request.into_parts();
        let rejection = PageContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(
            rejection,
            Err(PageContextRejection::MissingImageSource)
        ));
    }
}
