use std::fmt;
use std::sync::Arc;

pub use reqwest::Url;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Same-origin path of the document describing the running container image.
pub const CONTAINER_DATA_PATH: &str = "/data/container.json";

/// Identity of the container image serving the page.
///
/// `registry` and `namespace` are optional path segments: an empty string (or a missing /
/// `null` value in the source document) suppresses the segment in [`label`](Self::label).
/// Nothing stricter is validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ContainerImageDescriptor {
    #[serde(default, deserialize_with = "empty_if_null")]
    pub registry: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub namespace: String,
    pub repository: String,
    pub tag: String,
}

impl ContainerImageDescriptor {
    pub fn new(
        registry: impl Into<String>,
        namespace: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            namespace: namespace.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Formats the descriptor as `[registry/][namespace/]repository:tag`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContainerImageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.registry.is_empty() {
            write!(f, "{}/", self.registry)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Wire shape of `container.json`; the descriptor lives under the `image` key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ContainerDocument {
    pub image: ContainerImageDescriptor,
}

impl ContainerDocument {
    /// Parses a raw `container.json` body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ImageError> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fetches [`ContainerImageDescriptor`]s from `{origin}/data/container.json`.
///
/// Every call to [`fetch`](Self::fetch) issues exactly one plain `GET`: no retry, no backoff,
/// no caching. The client is cheap to clone and meant to be shared across requests.
///
/// # Examples
/// ```ignore
/// use it_worked_image::ImageClient;
///
/// # async fn demo() -> Result<(), it_worked_image::ImageError> {
/// let client = ImageClient::new("http://127.0.0.1:3000")?;
/// let image = client.fetch().await?;
/// println!("{}", image.label());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ImageClient {
    inner: Arc<ImageClientInner>,
}

#[derive(Debug)]
struct ImageClientInner {
    http: reqwest::Client,
    url: Url,
}

impl ImageClient {
    /// Creates a client for the given origin using a default HTTP client.
    ///
    /// # Errors
    /// Returns [`ImageError::InvalidOrigin`] when `origin` is not an absolute `http`/`https` URL.
    pub fn new(origin: &str) -> Result<Self, ImageError> {
        Self::with_http_client(origin, reqwest::Client::new())
    }

    /// Creates a client for the given origin on top of an existing [`reqwest::Client`].
    pub fn with_http_client(origin: &str, http: reqwest::Client) -> Result<Self, ImageError> {
        let url = container_data_url(origin)?;
        Ok(Self {
            inner: Arc::new(ImageClientInner { http, url }),
        })
    }

    /// Returns the absolute URL of the container document.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Requests and parses the container document once.
    ///
    /// # Errors
    /// Returns [`ImageError::Request`] on transport failures, [`ImageError::Status`] when the
    /// server answers with a non-success status, and [`ImageError::Malformed`] when the body is
    /// not JSON or lacks the expected shape.
    pub async fn fetch(&self) -> Result<ContainerImageDescriptor, ImageError> {
        let response = self.inner.http.get(self.inner.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status));
        }

        let body = response.bytes().await?;
        let document = ContainerDocument::from_slice(&body)?;
        tracing::debug!(url = %self.inner.url, image = %document.image, "container image loaded");
        Ok(document.image)
    }
}

/// Resolves [`CONTAINER_DATA_PATH`] against an `http`/`https` origin.
pub fn container_data_url(origin: &str) -> Result<Url, ImageError> {
    let invalid = || ImageError::InvalidOrigin(origin.to_owned());
    let base = Url::parse(origin).map_err(|_| invalid())?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid());
    }
    base.join(CONTAINER_DATA_PATH).map_err(|_| invalid())
}

/// Errors emitted by [`ImageClient`] while loading the container document.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed container document: {0}")]
    Malformed(#[from] serde_json::Error),
}
