use crate::models::{AuthContext, Role, Route};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Redirect(Route),
}

/// Only signed-in users who are not employers may see or submit the form.
/// Everyone else is sent home without an error.
pub fn check(auth: &AuthContext) -> Access {
    if !auth.is_authorized {
        return Access::Redirect(Route::Home);
    }

    match &auth.user {
        Some(user) if user.role == Role::Employer => Access::Redirect(Route::Home),
        _ => Access::Allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn context(is_authorized: bool, role: Option<Role>) -> AuthContext {
        AuthContext {
            is_authorized,
            user: role.map(|role| User {
                name: None,
                email: None,
                role,
            }),
        }
    }

    #[test]
    fn test_unauthenticated_goes_home() {
        assert_eq!(check(&context(false, None)), Access::Redirect(Route::Home));
        assert_eq!(
            check(&context(false, Some(Role::JobSeeker))),
            Access::Redirect(Route::Home)
        );
    }

    #[test]
    fn test_employer_goes_home() {
        assert_eq!(
            check(&context(true, Some(Role::Employer))),
            Access::Redirect(Route::Home)
        );
    }

    #[test]
    fn test_job_seeker_allowed() {
        assert_eq!(check(&context(true, Some(Role::JobSeeker))), Access::Allowed);
        assert_eq!(
            check(&context(true, Some(Role::Other("Admin".to_string())))),
            Access::Allowed
        );
    }

    #[test]
    fn test_authorized_without_user_record_allowed() {
        assert_eq!(check(&context(true, None)), Access::Allowed);
    }
}
