//! Get-or-create resolution for reference entities (genres, languages,
//! actors, directors), keyed by natural identity.
//!
//! Concurrent inserts of the same natural key are resolved by the database's
//! unique constraints: when an insert loses the race the violation is
//! swallowed and the winning row is re-queried.

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    sea_query::{Expr, Func},
};

use crate::{
    entities::{actor, director, genre, language},
    error::{AppError, AppResult},
};

/// Trim and collapse internal whitespace. Applied before every lookup so
/// " Ridley  Scott " and "Ridley Scott" resolve to the same row.
pub fn normalize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a display name on the first whitespace boundary. A single-token
/// name yields an empty last name ("Cher" -> ("Cher", "")).
pub fn split_person_name(name: &str) -> (String, String) {
    let normalized = normalize(name);
    match normalized.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (normalized, String::new()),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn vanished(what: &str) -> AppError {
    DbErr::RecordNotFound(format!("{what} missing after conflicting insert")).into()
}

pub async fn genre_id<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i32> {
    let name = normalize(name);
    let found =
        genre::Entity::find().filter(genre::Column::Name.eq(&name)).one(conn).await?;
    if let Some(existing) = found {
        return Ok(existing.id);
    }

    let model = genre::ActiveModel { name: Set(name.clone()), ..Default::default() };
    match genre::Entity::insert(model).exec(conn).await {
        Ok(res) => Ok(res.last_insert_id),
        Err(err) if is_unique_violation(&err) => genre::Entity::find()
            .filter(genre::Column::Name.eq(&name))
            .one(conn)
            .await?
            .map(|g| g.id)
            .ok_or_else(|| vanished("genre")),
        Err(err) => Err(err.into()),
    }
}

pub async fn language_id<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i32> {
    let name = normalize(name);
    let found =
        language::Entity::find().filter(language::Column::Name.eq(&name)).one(conn).await?;
    if let Some(existing) = found {
        return Ok(existing.id);
    }

    let model = language::ActiveModel { name: Set(name.clone()), ..Default::default() };
    match language::Entity::insert(model).exec(conn).await {
        Ok(res) => Ok(res.last_insert_id),
        Err(err) if is_unique_violation(&err) => language::Entity::find()
            .filter(language::Column::Name.eq(&name))
            .one(conn)
            .await?
            .map(|l| l.id)
            .ok_or_else(|| vanished("language")),
        Err(err) => Err(err.into()),
    }
}

// Person lookups compare case-folded but store the supplied casing. Names
// carry no unique constraint, so differently-cased concurrent inserts can
// still produce duplicate rows; that matches the accepted data model.

pub async fn actor_id<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i32> {
    let (first, last) = split_person_name(name);
    let found = actor::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col((actor::Entity, actor::Column::FirstName))))
                .eq(first.to_lowercase()),
        )
        .filter(
            Expr::expr(Func::lower(Expr::col((actor::Entity, actor::Column::LastName))))
                .eq(last.to_lowercase()),
        )
        .one(conn)
        .await?;
    if let Some(existing) = found {
        return Ok(existing.id);
    }

    let model = actor::ActiveModel {
        first_name: Set(first),
        last_name: Set(last),
        ..Default::default()
    };
    Ok(actor::Entity::insert(model).exec(conn).await?.last_insert_id)
}

pub async fn director_id<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<i32> {
    let (first, last) = split_person_name(name);
    let found = director::Entity::find()
        .filter(
            Expr::expr(Func::lower(Expr::col((director::Entity, director::Column::FirstName))))
                .eq(first.to_lowercase()),
        )
        .filter(
            Expr::expr(Func::lower(Expr::col((director::Entity, director::Column::LastName))))
                .eq(last.to_lowercase()),
        )
        .one(conn)
        .await?;
    if let Some(existing) = found {
        return Ok(existing.id);
    }

    let model = director::ActiveModel {
        first_name: Set(first),
        last_name: Set(last),
        ..Default::default()
    };
    Ok(director::Entity::insert(model).exec(conn).await?.last_insert_id)
}
