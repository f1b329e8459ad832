use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{CreateMovieRequest, Credentials, ListQuery, MovieDetail, MoviePage, TokenResponse},
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (username, password) = require_credentials(&body)?;
    let hash = auth::hash_password(password)?;
    state.catalog.create_user(username, &hash).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let (username, password) = require_credentials(&body)?;
    // Absent user and wrong password are indistinguishable to the caller.
    let user = state
        .catalog
        .find_user(username)
        .await?
        .ok_or_else(|| AppError::Auth("invalid credentials".to_string()))?;
    if !auth::verify_password(password, &user.password_hash)? {
        return Err(AppError::Auth("invalid credentials".to_string()));
    }
    let access_token = state.tokens.issue(user.id)?;
    Ok(Json(TokenResponse { access_token }))
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).max(1);
    let movies = state.catalog.list_movies(page, per_page, query.q.as_deref()).await?;
    Ok(Json(movies))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieDetail>> {
    state
        .catalog
        .movie_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("not found".to_string()))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(body): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("title required".to_string()))?;
    let id = state.catalog.create_movie(title, &body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "created", "id": id }))))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    if !state.catalog.delete_movie(id).await? {
        return Err(AppError::NotFound("not found".to_string()));
    }
    Ok(Json(json!({ "status": "deleted" })))
}

pub async fn seed(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> AppResult<Json<Value>> {
    let seeded = state.catalog.seed_samples().await?;
    let status = if seeded { "seeded" } else { "already seeded" };
    Ok(Json(json!({ "status": status })))
}

fn require_credentials(body: &Credentials) -> AppResult<(&str, &str)> {
    let username = body.username.as_deref().filter(|u| !u.is_empty());
    let password = body.password.as_deref().filter(|p| !p.is_empty());
    match (username, password) {
        (Some(u), Some(p)) => Ok((u, p)),
        _ => Err(AppError::Validation("username and password required".to_string())),
    }
}
