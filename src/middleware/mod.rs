use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

/// Заголовки, которые проставляет шлюз после проверки токена.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins see everyone's tickets, members only their own.
    pub fn can_view_tickets_of(&self, user_id: &str) -> bool {
        self.is_admin() || self.user_id.eq_ignore_ascii_case(user_id)
    }
}

// Личность пользователя берём из доверенных заголовков: токены выдаёт и
// проверяет внешний сервис авторизации.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            None => Role::Member,
            Some(value) => value
                .to_str()
                .ok()
                .and_then(Role::parse)
                .ok_or(StatusCode::FORBIDDEN)?,
        };

        Ok(AuthUser {
            user_id: user_id.to_string(),
            role,
        })
    }
}
