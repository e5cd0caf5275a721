use crate::error::ApiError;
use crate::models::{
    AuthenticatedUser, CacheClearResponse, CacheStatsResponse, LoginRequest, LoginResponse,
    LogoutResponse, NewUserRequest, User, WhoamiResponse,
};
use crate::services::AuthService;
use crate::state::AppState;
use log::info;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};

#[get("/api/v1/health")]
pub async fn health_check(state: &State<AppState>) -> Json<serde_json::Value> {
    let needs_setup = AuthService::count_users(&state.database).is_ok_and(|n| n == 0);
    Json(serde_json::json!({
        "status": "ok",
        "needs_setup": needs_setup,
    }))
}

/// Creates the first administrator and signs them in.
#[post("/api/v1/setup", data = "<request>")]
pub async fn setup(
    request: Json<NewUserRequest>,
    state: &State<AppState>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = request.into_inner();
    let password = request.password.clone();
    let user = AuthService::create_first_admin(&state.database, request)?;

    let (_user, token) = AuthService::authenticate_user(
        &state.database,
        LoginRequest {
            username: user.username,
            password,
        },
    )?;

    Ok(Json(LoginResponse { ok: true, token }))
}

#[post("/api/v1/login", data = "<login_request>")]
pub async fn login(
    login_request: Json<LoginRequest>,
    state: &State<AppState>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (_user, token) =
        AuthService::authenticate_user(&state.database, login_request.into_inner())?;

    Ok(Json(LoginResponse { ok: true, token }))
}

#[post("/api/v1/logout")]
pub async fn logout(
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<LogoutResponse>, ApiError> {
    AuthService::revoke_token(&state.database, &user.token)?;
    Ok(Json(LogoutResponse { ok: true }))
}

#[get("/api/v1/whoami")]
pub async fn whoami(user: AuthenticatedUser) -> Json<WhoamiResponse> {
    Json(WhoamiResponse {
        username: user.username,
        is_admin: user.is_admin,
    })
}

#[post("/api/v1/users", data = "<request>")]
pub async fn create_user(
    request: Json<NewUserRequest>,
    user: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<User>, ApiError> {
    let created = AuthService::register_user(&state.database, request.into_inner(), false)?;
    info!("User '{}' created by '{}'", created.username, user.username);
    Ok(Json(created))
}

#[get("/api/v1/cache/stats")]
pub async fn get_cache_stats(state: &State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.cache.stats())
}

#[delete("/api/v1/cache")]
pub async fn clear_cache(
    _user: AuthenticatedUser,
    state: &State<AppState>,
) -> Json<CacheClearResponse> {
    state.cache.clear();
    Json(CacheClearResponse { ok: true })
}
