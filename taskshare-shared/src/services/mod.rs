/// Access-control and consistency services
///
/// Each service owns an `Arc<dyn DocumentStore>` handed in at construction;
/// there is no global storage handle. Every mutating operation follows the
/// same shape: fetch the entity (not-found if absent), resolve the
/// requester's role, apply the change, validate, write.
///
/// - [`merge`]: role-scoped partial-update merging for tasks
/// - [`visibility`]: the owner/collaborator scatter-gather task listing
/// - [`membership`]: group membership with the best-effort user mirror
/// - [`tasks`], [`groups`], [`users`]: the operations built on top
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskshare_shared::services::Services;
/// use taskshare_shared::store::memory::MemoryStore;
///
/// let services = Services::new(Arc::new(MemoryStore::new()));
/// # let _ = services;
/// ```

pub mod groups;
pub mod membership;
pub mod merge;
pub mod tasks;
pub mod users;
pub mod visibility;

use crate::error::{CoreError, CoreResult};
use crate::store::{fetch, Collection, DocumentStore};
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub use groups::GroupService;
pub use membership::MembershipManager;
pub use tasks::TaskService;
pub use users::UserService;

/// Every service, wired to one store
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub tasks: TaskService,
    pub groups: GroupService,
    pub membership: MembershipManager,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let membership = MembershipManager::new(store.clone());

        Self {
            users: UserService::new(store.clone()),
            tasks: TaskService::new(store.clone()),
            groups: GroupService::new(store, membership.clone()),
            membership,
        }
    }
}

/// Fetches and decodes a document, failing with `NotFound` when absent
pub(crate) async fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> CoreResult<T> {
    fetch(store, collection, id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("{} {}", collection.entity_name(), id)))
}
