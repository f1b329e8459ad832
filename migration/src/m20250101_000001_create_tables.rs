use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::Id))
                    .col(string(User::Username))
                    .col(string(User::PasswordHash))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_username_unique")
                    .table(User::Table)
                    .col(User::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string(Movie::Title))
                    .col(integer_null(Movie::Duration))
                    .col(integer_null(Movie::Year))
                    .col(text_null(Movie::Poster))
                    .col(text_null(Movie::Description))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_title_unique")
                    .table(Movie::Table)
                    .col(Movie::Title)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string(Genre::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genre_name_unique")
                    .table(Genre::Table)
                    .col(Genre::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Language::Table)
                    .if_not_exists()
                    .col(pk_auto(Language::Id))
                    .col(string(Language::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_language_name_unique")
                    .table(Language::Table)
                    .col(Language::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Person names carry no unique index; duplicate people are tolerated.
        manager
            .create_table(
                Table::create()
                    .table(Actor::Table)
                    .if_not_exists()
                    .col(pk_auto(Actor::Id))
                    .col(string(Actor::FirstName))
                    .col(string(Actor::LastName))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Director::Table)
                    .if_not_exists()
                    .col(pk_auto(Director::Id))
                    .col(string(Director::FirstName))
                    .col(string(Director::LastName))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(integer(MovieGenre::MovieId))
                    .col(integer(MovieGenre::GenreId))
                    .primary_key(
                        Index::create().col(MovieGenre::MovieId).col(MovieGenre::GenreId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieGenre::Table, MovieGenre::GenreId)
                            .to(Genre::Table, Genre::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieActor::Table)
                    .if_not_exists()
                    .col(integer(MovieActor::MovieId))
                    .col(integer(MovieActor::ActorId))
                    .primary_key(
                        Index::create().col(MovieActor::MovieId).col(MovieActor::ActorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieActor::Table, MovieActor::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieActor::Table, MovieActor::ActorId)
                            .to(Actor::Table, Actor::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieDirector::Table)
                    .if_not_exists()
                    .col(integer(MovieDirector::MovieId))
                    .col(integer(MovieDirector::DirectorId))
                    .primary_key(
                        Index::create()
                            .col(MovieDirector::MovieId)
                            .col(MovieDirector::DirectorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieDirector::Table, MovieDirector::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieDirector::Table, MovieDirector::DirectorId)
                            .to(Director::Table, Director::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieLanguage::Table)
                    .if_not_exists()
                    .col(integer(MovieLanguage::MovieId))
                    .col(integer(MovieLanguage::LanguageId))
                    .primary_key(
                        Index::create()
                            .col(MovieLanguage::MovieId)
                            .col(MovieLanguage::LanguageId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieLanguage::Table, MovieLanguage::MovieId)
                            .to(Movie::Table, Movie::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(MovieLanguage::Table, MovieLanguage::LanguageId)
                            .to(Language::Table, Language::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieLanguage::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieDirector::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieActor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Director::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Actor::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Language::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    PasswordHash,
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Title,
    Duration,
    Year,
    Poster,
    Description,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Language {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Actor {
    Table,
    Id,
    FirstName,
    LastName,
}

#[derive(DeriveIden)]
enum Director {
    Table,
    Id,
    FirstName,
    LastName,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum MovieActor {
    Table,
    MovieId,
    ActorId,
}

#[derive(DeriveIden)]
enum MovieDirector {
    Table,
    MovieId,
    DirectorId,
}

#[derive(DeriveIden)]
enum MovieLanguage {
    Table,
    MovieId,
    LanguageId,
}
