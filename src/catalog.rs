use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, LoaderTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait, sea_query::OnConflict,
};

use crate::{
    entities::{
        actor, director, genre, language, movie, movie_actor, movie_director, movie_genre,
        movie_language, user,
    },
    error::{AppError, AppResult},
    models::{CreateMovieRequest, MovieDetail, MoviePage},
    resolve,
};

/// All persistence operations behind the route layer. Holds the connection
/// pool; constructed once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find_user(&self, username: &str) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<()> {
        let model = user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            ..Default::default()
        };
        match user::Entity::insert(model).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(AppError::Conflict("username exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_movies(
        &self,
        page: u64,
        per_page: u64,
        q: Option<&str>,
    ) -> AppResult<MoviePage> {
        let mut query = movie::Entity::find().order_by_asc(movie::Column::Title);
        if let Some(q) = q.filter(|q| !q.is_empty()) {
            query = query.filter(movie::Column::Title.contains(q));
        }

        let paginator = query.paginate(&self.db, per_page);
        let counts = paginator.num_items_and_pages().await?;
        let movies = paginator.fetch_page(page - 1).await?;
        let items = self.hydrate(movies).await?;

        Ok(MoviePage {
            total: counts.number_of_items,
            page,
            per_page,
            pages: counts.number_of_pages,
            items,
        })
    }

    pub async fn movie_detail(&self, id: i32) -> AppResult<Option<MovieDetail>> {
        let Some(found) = movie::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let mut items = self.hydrate(vec![found]).await?;
        Ok(items.pop())
    }

    /// Inserts the movie and attaches all reference metadata in a single
    /// transaction, so a failed attachment never leaves a half-built movie
    /// behind.
    pub async fn create_movie(&self, title: &str, req: &CreateMovieRequest) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        let exists = movie::Entity::find()
            .filter(movie::Column::Title.eq(title))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            return Err(AppError::Conflict("movie already exists".to_string()));
        }

        let model = movie::ActiveModel {
            title: Set(title.to_string()),
            duration: Set(req.duration),
            year: Set(req.year),
            poster: Set(req.poster.clone()),
            description: Set(req.description.clone()),
            ..Default::default()
        };
        let movie_id = match movie::Entity::insert(model).exec(&txn).await {
            Ok(res) => res.last_insert_id,
            Err(err) if is_unique_violation(&err) => {
                return Err(AppError::Conflict("movie already exists".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        for name in &req.genres {
            let genre_id = resolve::genre_id(&txn, name).await?;
            let link = movie_genre::ActiveModel { movie_id: Set(movie_id), genre_id: Set(genre_id) };
            movie_genre::Entity::insert(link)
                .on_conflict(
                    OnConflict::columns([movie_genre::Column::MovieId, movie_genre::Column::GenreId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        for name in &req.actors {
            let actor_id = resolve::actor_id(&txn, name).await?;
            let link = movie_actor::ActiveModel { movie_id: Set(movie_id), actor_id: Set(actor_id) };
            movie_actor::Entity::insert(link)
                .on_conflict(
                    OnConflict::columns([movie_actor::Column::MovieId, movie_actor::Column::ActorId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        for name in &req.directors {
            let director_id = resolve::director_id(&txn, name).await?;
            let link = movie_director::ActiveModel {
                movie_id: Set(movie_id),
                director_id: Set(director_id),
            };
            movie_director::Entity::insert(link)
                .on_conflict(
                    OnConflict::columns([
                        movie_director::Column::MovieId,
                        movie_director::Column::DirectorId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        for name in &req.languages {
            let language_id = resolve::language_id(&txn, name).await?;
            let link = movie_language::ActiveModel {
                movie_id: Set(movie_id),
                language_id: Set(language_id),
            };
            movie_language::Entity::insert(link)
                .on_conflict(
                    OnConflict::columns([
                        movie_language::Column::MovieId,
                        movie_language::Column::LanguageId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(movie_id)
    }

    /// Removes the movie and its join rows. Reference entities stay, even
    /// when no other movie links to them.
    pub async fn delete_movie(&self, id: i32) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Ok(false);
        }

        movie_genre::Entity::delete_many()
            .filter(movie_genre::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie_actor::Entity::delete_many()
            .filter(movie_actor::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie_director::Entity::delete_many()
            .filter(movie_director::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie_language::Entity::delete_many()
            .filter(movie_language::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    /// Inserts the fixed sample movies unless the catalog already holds any
    /// movie. Returns false when it was a no-op.
    pub async fn seed_samples(&self) -> AppResult<bool> {
        if movie::Entity::find().count(&self.db).await? > 0 {
            return Ok(false);
        }

        let samples = [
            ("Inception", Some(148), Some(2010), "A mind-bending thriller."),
            ("The Shawshank Redemption", Some(142), Some(1994), "Two imprisoned men bond."),
            ("La La Land", Some(128), Some(2016), "A jazz pianist falls for an aspiring actress."),
        ];
        for (title, duration, year, description) in samples {
            let model = movie::ActiveModel {
                title: Set(title.to_string()),
                duration: Set(duration),
                year: Set(year),
                description: Set(Some(description.to_string())),
                ..Default::default()
            };
            movie::Entity::insert(model).exec(&self.db).await?;
        }
        Ok(true)
    }

    /// Startup seeding: a minimal set of reference rows on a fresh database.
    pub async fn ensure_reference_rows(&self) -> AppResult<()> {
        if genre::Entity::find().count(&self.db).await? > 0 {
            return Ok(());
        }
        resolve::genre_id(&self.db, "Drama").await?;
        resolve::language_id(&self.db, "English").await?;
        Ok(())
    }

    async fn hydrate(&self, movies: Vec<movie::Model>) -> AppResult<Vec<MovieDetail>> {
        let genres = movies.load_many_to_many(genre::Entity, movie_genre::Entity, &self.db).await?;
        let actors = movies.load_many_to_many(actor::Entity, movie_actor::Entity, &self.db).await?;
        let directors =
            movies.load_many_to_many(director::Entity, movie_director::Entity, &self.db).await?;
        let languages =
            movies.load_many_to_many(language::Entity, movie_language::Entity, &self.db).await?;

        Ok(movies
            .into_iter()
            .zip(genres)
            .zip(actors)
            .zip(directors)
            .zip(languages)
            .map(|((((m, genres), actors), directors), languages)| MovieDetail {
                id: m.id,
                title: m.title,
                duration: m.duration,
                year: m.year,
                poster: m.poster,
                description: m.description,
                genres: genres.into_iter().map(|g| g.name).collect(),
                actors: actors.into_iter().map(|a| display_name(&a.first_name, &a.last_name)).collect(),
                directors: directors
                    .into_iter()
                    .map(|d| display_name(&d.first_name, &d.last_name))
                    .collect(),
                languages: languages.into_iter().map(|l| l.name).collect(),
            })
            .collect())
    }
}

fn display_name(first: &str, last: &str) -> String {
    format!("{first} {last}").trim().to_string()
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
