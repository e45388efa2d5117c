use crate::{
    auth::{
        guard::{Access, GuardOutcome, ROLE_UNASSIGNED, Redirect, decide, is_public},
        profile::ProfileResolution,
    },
    common::is_local_path,
};

/// Where a freshly signed-in caller lands.
///
/// A requested return path is honoured only when it is local and the
/// resolved role may open it; otherwise the role's home is used.
pub fn post_login(resolution: &ProfileResolution, next: Option<&str>) -> Redirect {
    let role = match resolution {
        ProfileResolution::Resolved(profile) => profile.role,
        ProfileResolution::Unassigned(_) => return Redirect::LoginError(ROLE_UNASSIGNED),
    };

    let allowed = next.filter(|next| {
        if !is_local_path(next) {
            return false;
        }
        let (path, query) = match next.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (*next, None),
        };
        !is_public(path) && decide(path, query, &Access::Granted(role)) == GuardOutcome::Allow
    });

    match allowed {
        Some(next) => Redirect::To(next.to_string()),
        None => Redirect::home(role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::profile::{Profile, Role, RoleError};
    use uuid::Uuid;

    fn resolved(role: Role) -> ProfileResolution {
        ProfileResolution::Resolved(Profile {
            user_id: Uuid::new_v4(),
            role,
            sales_rep_id: None,
        })
    }

    #[test]
    fn roles_land_on_their_home() {
        assert_eq!(post_login(&resolved(Role::Admin), None).location(), "/dashboard");
        assert_eq!(post_login(&resolved(Role::Vendedor), None).location(), "/portal");
    }

    #[test]
    fn unassigned_roles_go_back_to_login() {
        let resolution = ProfileResolution::Unassigned(RoleError::Unset);
        assert_eq!(
            post_login(&resolution, Some("/portal")).location(),
            "/login?error=role_unassigned"
        );
    }

    #[test]
    fn return_paths_are_followed_when_reachable() {
        assert_eq!(
            post_login(&resolved(Role::Admin), Some("/vendas?from=2024-01-01")).location(),
            "/vendas?from=2024-01-01"
        );
        assert_eq!(
            post_login(&resolved(Role::Vendedor), Some("/portal/metas")).location(),
            "/portal/metas"
        );
    }

    #[test]
    fn unreachable_or_foreign_return_paths_are_dropped() {
        assert_eq!(
            post_login(&resolved(Role::Vendedor), Some("/dashboard")).location(),
            "/portal"
        );
        assert_eq!(
            post_login(&resolved(Role::Admin), Some("//evil.example/x")).location(),
            "/dashboard"
        );
        assert_eq!(
            post_login(&resolved(Role::Admin), Some("/login")).location(),
            "/dashboard"
        );
    }
}
