//! Authenticated-actor lookup used to scope writes

use crate::remote::RemoteResult;

/// The signed-in user performing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

/// Source of the current actor and their tenant.
///
/// `current_actor` answers from local session state and never blocks;
/// `institution_id` needs the profile store and is only called online.
#[allow(async_fn_in_trait)]
pub trait ActorProvider {
    fn current_actor(&self) -> Option<Actor>;

    /// Institution assigned to `actor`'s profile, `None` when unassigned
    async fn institution_id(&self, actor: &Actor) -> RemoteResult<Option<String>>;
}
