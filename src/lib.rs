//! It Worked! deployment check page.
//!
//! Serves a page confirming that the container was deployed, with a footer naming the image
//! (`registry/namespace/repository:tag`) that is serving it. The image is read on every page
//! load from `/data/container.json` on the same origin, which this crate also serves out of a
//! data directory populated by the deployment pipeline.

pub mod config;
pub mod context;
pub mod error;
pub mod page;
pub mod platform;
pub mod routes;
pub mod runtime;

pub use crate::config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use crate::context::{PageContext, RequestMetadata};
pub use crate::error::{ItWorkedError, Result};
pub use crate::page::{FALLBACK_FOOTER, HEADLINE, ImageSource, Page, PageState, SharedImageSource};
pub use crate::platform::{KubernetesPlatform, RuntimePlatform};
pub use crate::routes::app;
pub use crate::runtime::{run, serve, serve_on};
pub use it_worked_image::{
    CONTAINER_DATA_PATH, ContainerDocument, ContainerImageDescriptor, ImageClient, ImageError,
};
