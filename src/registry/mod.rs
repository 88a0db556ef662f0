pub mod dockerhub;
pub mod gcr;

use crate::errors::RegistryError;
use crate::inventory::Repository;
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;

pub use dockerhub::DockerHubClient;
pub use gcr::GcrClient;

/// Capability set shared by every registry backend: login, paginated
/// enumeration of repositories and images, and two-phase image deletion.
///
/// The set of registries is closed and known up front, so this is modeled
/// as a tagged-variant enum dispatched through `enum_dispatch` rather than
/// an open trait-object hierarchy.
#[async_trait]
#[enum_dispatch]
pub trait InteractWithRegistry: Send + Sync {
    async fn login(&mut self) -> Result<(), RegistryError>;

    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError>;

    async fn describe_repository(&self, path: &str) -> Result<Repository, RegistryError>;

    /// Deletes every tag reference, then every remaining digest, for the
    /// given image in `repository`. Aborts if any tag delete fails so a
    /// manifest is never left dangling behind a tag that failed to detach.
    async fn delete_image(
        &self,
        repository: &str,
        tags: &[String],
        digest: &str,
    ) -> Result<(), RegistryError>;
}

#[enum_dispatch(InteractWithRegistry)]
pub enum RegistryClient {
    Gcr(GcrClient),
    DockerHub(DockerHubClient),
}
