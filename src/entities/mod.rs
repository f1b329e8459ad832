pub mod actor;
pub mod director;
pub mod genre;
pub mod language;
pub mod movie;
pub mod movie_actor;
pub mod movie_director;
pub mod movie_genre;
pub mod movie_language;
pub mod user;
