//! Role-based access decisions for the entity endpoints.
//!
//! Pure classification over (actor role, actor id, target owner id,
//! action); nothing here touches the database. Denials are rendered by
//! [`ApiError::denied`](super::error::ApiError::denied), which deliberately
//! reuses the not-found message.

use super::auth::Actor;
use crate::db::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Show,
    Create,
    Update,
    Delete,
}

/// Access table for coordinator records. Listing, reading and creating are
/// administrator-only; updates and deletes also allow the owning account.
pub fn coordinators(actor: Option<&Actor>, target: Option<&str>, action: Action) -> bool {
    let Some(actor) = actor else { return false };
    match action {
        Action::List | Action::Show | Action::Create => matches!(actor.role, Role::Admin),
        Action::Update | Action::Delete => {
            matches!(actor.role, Role::Admin) || target == Some(actor.id.as_str())
        }
    }
}

/// Access table for company records. Creation is open self-registration and
/// never gated; updates are owner-only, with no administrator override.
pub fn companies(actor: Option<&Actor>, target: Option<&str>, action: Action) -> bool {
    if action == Action::Create {
        return true;
    }
    let Some(actor) = actor else { return false };
    match action {
        Action::List => matches!(actor.role, Role::Admin | Role::Coordinator),
        Action::Show => {
            matches!(actor.role, Role::Admin | Role::Coordinator)
                || target == Some(actor.id.as_str())
        }
        Action::Create => true,
        Action::Update => target == Some(actor.id.as_str()),
        Action::Delete => {
            matches!(actor.role, Role::Admin) || target == Some(actor.id.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_is_never_denied_a_coordinator_action() {
        let admin = actor(Role::Admin, "a-1");
        for action in [Action::List, Action::Show, Action::Create, Action::Update, Action::Delete] {
            assert!(coordinators(Some(&admin), Some("c-1"), action));
        }
    }

    #[test]
    fn test_coordinator_table_for_non_admin_roles() {
        let owner = actor(Role::Coordinator, "c-1");
        // Owner may update and delete their own record, nothing else.
        assert!(coordinators(Some(&owner), Some("c-1"), Action::Update));
        assert!(coordinators(Some(&owner), Some("c-1"), Action::Delete));
        assert!(!coordinators(Some(&owner), None, Action::List));
        assert!(!coordinators(Some(&owner), Some("c-1"), Action::Show));
        assert!(!coordinators(Some(&owner), None, Action::Create));

        // A non-owning non-admin actor cannot touch another's record.
        let other = actor(Role::Coordinator, "c-2");
        assert!(!coordinators(Some(&other), Some("c-1"), Action::Update));
        assert!(!coordinators(Some(&other), Some("c-1"), Action::Delete));

        let company = actor(Role::Company, "e-1");
        assert!(!coordinators(Some(&company), Some("c-1"), Action::Update));
    }

    #[test]
    fn test_company_list_and_show() {
        let admin = actor(Role::Admin, "a-1");
        let coordinator = actor(Role::Coordinator, "c-1");
        let owner = actor(Role::Company, "e-1");
        let student = actor(Role::Student, "s-1");

        assert!(companies(Some(&admin), None, Action::List));
        assert!(companies(Some(&coordinator), None, Action::List));
        assert!(!companies(Some(&owner), None, Action::List));
        assert!(!companies(Some(&student), None, Action::List));

        assert!(companies(Some(&admin), Some("e-1"), Action::Show));
        assert!(companies(Some(&coordinator), Some("e-1"), Action::Show));
        assert!(companies(Some(&owner), Some("e-1"), Action::Show));
        assert!(!companies(Some(&owner), Some("e-2"), Action::Show));
    }

    #[test]
    fn test_company_create_is_open() {
        assert!(companies(None, None, Action::Create));
        let student = actor(Role::Student, "s-1");
        assert!(companies(Some(&student), None, Action::Create));
    }

    #[test]
    fn test_company_update_is_owner_only() {
        let admin = actor(Role::Admin, "a-1");
        let owner = actor(Role::Company, "e-1");
        assert!(companies(Some(&owner), Some("e-1"), Action::Update));
        // Even administrators cannot update another account's company.
        assert!(!companies(Some(&admin), Some("e-1"), Action::Update));
    }

    #[test]
    fn test_company_delete_is_admin_or_owner() {
        let admin = actor(Role::Admin, "a-1");
        let owner = actor(Role::Company, "e-1");
        let other = actor(Role::Company, "e-2");
        assert!(companies(Some(&admin), Some("e-1"), Action::Delete));
        assert!(companies(Some(&owner), Some("e-1"), Action::Delete));
        assert!(!companies(Some(&other), Some("e-1"), Action::Delete));
    }

    #[test]
    fn test_unauthenticated_actor_is_denied_everything_else() {
        assert!(!coordinators(None, None, Action::List));
        assert!(!companies(None, None, Action::List));
        assert!(!companies(None, Some("e-1"), Action::Update));
    }
}
