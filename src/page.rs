use std::borrow::Cow;
use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;

use it_worked_image::{ContainerImageDescriptor, ImageClient, ImageError};

pub const HEADLINE: &str = "It worked!";
pub const DEPLOYED_LINES: [&str; 2] = ["You have deployed a basic web page", "into Kubernetes"];
/// Footer shown whenever the container document could not be loaded.
pub const FALLBACK_FOOTER: &str = "Could not fetch data/container.json";

/// Anything that can produce the descriptor of the image serving the page.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self) -> Result<ContainerImageDescriptor, ImageError>;
}

#[async_trait]
impl ImageSource for ImageClient {
    async fn fetch_image(&self) -> Result<ContainerImageDescriptor, ImageError> {
        self.fetch().await
    }
}

/// Shared handle stored in request extensions.
pub type SharedImageSource = Arc<dyn ImageSource>;

/// View state of a mounted page: either nothing is known about the image or the full
/// descriptor was loaded. There is no partial state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PageState {
    #[default]
    Absent,
    Loaded(ContainerImageDescriptor),
}

impl PageState {
    pub fn image(&self) -> Option<&ContainerImageDescriptor> {
        match self {
            PageState::Loaded(image) => Some(image),
            PageState::Absent => None,
        }
    }
}

/// One rendering of the "It worked!" page.
///
/// [`Page::mount`] performs the single fetch; everything after that is a pure projection of
/// [`PageState`].
#[derive(Clone, Debug, Default)]
pub struct Page {
    state: PageState,
}

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    headline: &'a str,
    lines: &'a [&'a str],
    footer: &'a str,
}

impl Page {
    /// Creates a page whose image is not known yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts a page: fetches the container document exactly once and records the outcome.
    ///
    /// Failures are logged and leave the page [`PageState::Absent`]; they never propagate.
    pub async fn mount(source: &dyn ImageSource) -> Self {
        let mut page = Self::new();
        match source.fetch_image().await {
            Ok(image) => page.state = PageState::Loaded(image),
            Err(err) => {
                tracing::error!(error = %err, "could not fetch data/container.json; image and registry unknown");
            }
        }
        page
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Footer text: the image label, or [`FALLBACK_FOOTER`] when nothing was loaded.
    pub fn footer(&self) -> Cow<'static, str> {
        match &self.state {
            PageState::Loaded(image) => Cow::Owned(image.label()),
            PageState::Absent => Cow::Borrowed(FALLBACK_FOOTER),
        }
    }

    /// Renders the full HTML document.
    pub fn render(&self) -> Result<String, askama::Error> {
        let footer = self.footer();
        PageTemplate {
            headline: HEADLINE,
            lines: &DEPLOYED_LINES,
            footer: &footer,
        }
        .render()
    }
}
