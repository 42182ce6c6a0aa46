//! Relation handles, include specifications and the include loader.
//!
//! ## Example
//!
//! ```rust,ignore
//! // Eager load each user's latest posts and the number of sessions
//! let users = client
//!     .user()
//!     .find_many()
//!     .include(user::posts::include().order_by(post::created_at::desc()).take(3))
//!     .include(user::sessions::count())
//!     .exec()
//!     .await?;
//! ```

mod field;
mod include;
pub(crate) mod loader;

pub use field::RelationField;
pub use include::{Include, IncludeEntry, IncludeSpec, RelationInclude};

use crate::meta::RelationMeta;
use crate::sql::Scope;

/// Correlate a subquery over the relation target (`inner`) with the row of
/// the owning model (`outer`).
pub(crate) fn join_condition(relation: &RelationMeta, outer: &Scope, inner: &Scope) -> String {
    relation
        .join_pairs()
        .map(|(col, ref_col)| format!("{} = {}", inner.column(ref_col), outer.qualified(col)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::{post, user};

    #[test]
    fn test_join_condition_from_root() {
        let posts = user::META.relation("posts").unwrap();
        let root = Scope::root("User");
        let inner = root.nested("Post");
        assert_eq!(
            join_condition(posts, &root, &inner),
            "\"r1\".\"createdById\" = \"User\".\"id\""
        );
    }

    #[test]
    fn test_join_condition_between_nested_scopes() {
        let created_by = post::META.relation("createdBy").unwrap();
        let outer = Scope::root("User").nested("Post");
        let inner = outer.nested("User");
        assert_eq!(
            join_condition(created_by, &outer, &inner),
            "\"r2\".\"id\" = \"r1\".\"createdById\""
        );
    }
}
