use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateMovieRequest {
    pub title: Option<String>,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// A movie with its flattened relationship names, the shape every read
/// endpoint returns.
#[derive(Debug, Serialize)]
pub struct MovieDetail {
    pub id: i32,
    pub title: String,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MoviePage {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
    pub items: Vec<MovieDetail>,
}
