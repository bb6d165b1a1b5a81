use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{repo as accounts_repo, services::generate_ledger_address},
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        repo::is_unique_violation,
        repo_types::{NewUser, User},
        services::{
            generate_unlock_password, hash_password, is_valid_email, verify_password, AuthUser,
            JwtKeys,
        },
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<(String, String), (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        internal(e)
    })?;
    Ok((access_token, refresh_token))
}

async fn public_user(state: &AppState, user: User) -> Result<PublicUser, (StatusCode, String)> {
    let account = accounts_repo::find_account_by_user(&state.db, user.id)
        .await
        .map_err(internal)?;
    let eth_account = accounts_repo::find_eth_account_by_user(&state.db, user.id)
        .await
        .map_err(internal)?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
        address: account.map(|a| a.address),
        eth_address: eth_account.map(|a| a.address),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let existing = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(|e| {
            error!(error = %e, "find_by_email failed");
            internal(e)
        })?;
    if existing.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        internal(e)
    })?;

    let eth_password = generate_unlock_password();
    let eth_address = state.chain.new_account(&eth_password).await.map_err(|e| {
        error!(error = %e, "node refused to create account");
        (StatusCode::BAD_GATEWAY, "Could not create blockchain account".to_string())
    })?;
    let ledger_address = generate_ledger_address();

    let new_user = NewUser {
        email: &payload.email,
        password_hash: &hash,
        ledger_address: &ledger_address,
        eth_address: &eth_address,
        eth_password: &eth_password,
    };
    let user = User::create_with_accounts(&state.db, &new_user)
        .await
        .map_err(|e| {
            // The node already holds a key for this address; nothing in the database points to it.
            error!(error = %e, %eth_address, "create user failed, node account orphaned");
            if is_unique_violation(&e) {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            } else {
                internal(e)
            }
        })?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;

    info!(user_id = %user.id, address = %ledger_address, eth_address = %eth_address, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser {
                id: user.id,
                email: user.email,
                address: Some(ledger_address),
                eth_address: Some(eth_address),
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(internal(e));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        internal(e)
    })?;

    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, user).await?,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(&state, user).await?,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "load user failed");
            internal(e)
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(public_user(&state, user).await?))
}
