use rocket::serde::{Deserialize, Serialize};
use rocket::{
    State,
    http::Status,
    request::{FromRequest, Outcome, Request},
};

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub ok: bool,
    pub token: String,
}

/// Body of both first-run admin setup and user creation.
#[derive(Deserialize, Debug, Clone)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Serialize, Debug)]
pub struct WhoamiResponse {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Serialize, Debug)]
pub struct LogoutResponse {
    pub ok: bool,
}

// Authentication guard for extracting user from Authorization header
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub user_id: i32,
    pub is_admin: bool,
    pub token: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = crate::error::ApiError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        use crate::error::ApiError;
        use crate::services::AuthService;
        use crate::state::AppState;

        let state = match request.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    ApiError::InternalServerError("Application state unavailable".to_string()),
                ));
            }
        };

        let Some(auth_value) = request.headers().get_one("Authorization") else {
            return Outcome::Error((
                Status::Unauthorized,
                ApiError::Unauthorized("Authorization header required".to_string()),
            ));
        };

        let Some(token) = auth_value.strip_prefix("Bearer ") else {
            return Outcome::Error((
                Status::Unauthorized,
                ApiError::Unauthorized("Invalid authorization format".to_string()),
            ));
        };

        match AuthService::validate_token(&state.database, token) {
            Ok(user) => Outcome::Success(AuthenticatedUser {
                username: user.username,
                user_id: user.id,
                is_admin: user.is_admin,
                token: token.to_string(),
            }),
            Err(_) => Outcome::Error((
                Status::Unauthorized,
                ApiError::Unauthorized("Invalid token".to_string()),
            )),
        }
    }
}

impl AuthenticatedUser {
    /// Owners and administrators may modify or erase a record.
    pub fn can_modify(&self, owner_id: i32) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}
