use crate::error::ApiError;
use crate::models::{
    FormErrors, LoginRequest, NewUser, NewUserRequest, NewUserToken, User, UserToken,
    validate_name,
};
use crate::schema::{user_tokens, users};
use crate::services::DatabaseService;
use diesel::prelude::*;
use log::{debug, info};

const MIN_PASSWORD_LENGTH: usize = 8;

pub struct AuthService;

impl AuthService {
    pub fn count_users(db: &DatabaseService) -> Result<i64, ApiError> {
        let mut conn = db.get_connection().map_err(|e| {
            ApiError::InternalServerError(format!("Database connection error: {e}"))
        })?;

        users::table
            .count()
            .get_result(&mut conn)
            .map_err(|e| ApiError::InternalServerError(format!("Database query error: {e}")))
    }

    /// Creates the first account as an administrator. Refused once any user
    /// exists.
    pub fn create_first_admin(
        db: &DatabaseService,
        request: NewUserRequest,
    ) -> Result<User, ApiError> {
        if Self::count_users(db)? > 0 {
            return Err(ApiError::Conflict(
                "Setup has already been completed".to_string(),
            ));
        }

        let user = Self::register_user(db, request, true)?;
        info!("Created administrator account '{}'", user.username);
        Ok(user)
    }

    pub fn register_user(
        db: &DatabaseService,
        request: NewUserRequest,
        is_admin: bool,
    ) -> Result<User, ApiError> {
        let mut errors = FormErrors::default();
        validate_name(&mut errors, "username", &request.username);
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Ensure this value has at least {MIN_PASSWORD_LENGTH} characters."),
            );
        }
        if request.password != request.password_confirmation {
            errors.add("password_confirmation", "The two password fields didn't match.");
        }
        errors.into_result().map_err(ApiError::Validation)?;

        let mut conn = db.get_connection().map_err(|e| {
            ApiError::InternalServerError(format!("Database connection error: {e}"))
        })?;

        let existing_user = users::table
            .filter(users::username.eq(&request.username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| ApiError::InternalServerError(format!("Database query error: {e}")))?;

        if existing_user.is_some() {
            return Err(ApiError::invalid(
                "username",
                "A user with that username already exists.",
            ));
        }

        let new_user = NewUser::new(request.username, &request.password, is_admin)
            .map_err(|e| ApiError::InternalServerError(format!("Password hashing error: {e}")))?;

        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .map_err(|e| ApiError::InternalServerError(format!("Failed to create user: {e}")))?;

        debug!("User registered successfully: {}", user.username);
        Ok(user)
    }

    pub fn authenticate_user(
        db: &DatabaseService,
        request: LoginRequest,
    ) -> Result<(User, String), ApiError> {
        let mut conn = db.get_connection().map_err(|e| {
            ApiError::InternalServerError(format!("Database connection error: {e}"))
        })?;

        let user = users::table
            .filter(users::username.eq(&request.username))
            .filter(users::is_active.eq(true))
            .select(User::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| ApiError::InternalServerError(format!("Database query error: {e}")))?
            .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

        let password_valid = user.verify_password(&request.password).map_err(|e| {
            ApiError::InternalServerError(format!("Password verification error: {e}"))
        })?;

        if !password_valid {
            return Err(ApiError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        let new_token = NewUserToken::new_session_token(user.id);
        let token_value = new_token.token.clone();

        diesel::insert_into(user_tokens::table)
            .values(&new_token)
            .execute(&mut conn)
            .map_err(|e| ApiError::InternalServerError(format!("Failed to create token: {e}")))?;

        debug!("User authenticated successfully: {}", user.username);
        Ok((user, token_value))
    }

    pub fn validate_token(db: &DatabaseService, token: &str) -> Result<User, ApiError> {
        let mut conn = db.get_connection().map_err(|e| {
            ApiError::InternalServerError(format!("Database connection error: {e}"))
        })?;

        let user_token = user_tokens::table
            .filter(user_tokens::token.eq(token))
            .filter(user_tokens::is_active.eq(true))
            .select(UserToken::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| ApiError::InternalServerError(format!("Database query error: {e}")))?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        if let Some(expires_at) = user_token.expires_at {
            let now = chrono::Utc::now().naive_utc();
            if now > expires_at {
                return Err(ApiError::Unauthorized("Token expired".to_string()));
            }
        }

        users::table
            .filter(users::id.eq(user_token.user_id))
            .filter(users::is_active.eq(true))
            .select(User::as_select())
            .first(&mut conn)
            .map_err(|e| ApiError::Unauthorized(format!("Failed to retrieve user: {e}")))
    }

    pub fn revoke_token(db: &DatabaseService, token: &str) -> Result<(), ApiError> {
        let mut conn = db.get_connection().map_err(|e| {
            ApiError::InternalServerError(format!("Database connection error: {e}"))
        })?;

        diesel::update(user_tokens::table.filter(user_tokens::token.eq(token)))
            .set(user_tokens::is_active.eq(false))
            .execute(&mut conn)
            .map_err(|e| ApiError::InternalServerError(format!("Failed to revoke token: {e}")))?;

        debug!("Token revoked successfully");
        Ok(())
    }
}
