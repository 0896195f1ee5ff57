use bookstore_dal::book::Book;
use bookstore_types::claim::{ApiClaim, Authorization as _};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn enforce(self) -> ApiResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            )),
        }
    }
}

/// Book can be modified by its owner or by staff
pub fn can_modify(actor: &ApiClaim, book: &Book) -> Decision {
    if actor.is_staff() {
        return Decision::Allow;
    }
    match (actor.user_id(), book.owner_id) {
        (Some(actor_id), Some(owner_id)) if actor_id == owner_id => Decision::Allow,
        _ => {
            debug!("User {} is not owner of book {}", actor.sub, book.id);
            Decision::Deny
        }
    }
}
