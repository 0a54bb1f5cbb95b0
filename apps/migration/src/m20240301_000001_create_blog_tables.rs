use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogMetas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlogMetas::BlogKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlogMetas::Id).string().not_null())
                    .col(ColumnDef::new(BlogMetas::SourceId).string())
                    .col(ColumnDef::new(BlogMetas::Name).string().not_null())
                    .col(ColumnDef::new(BlogMetas::Description).text())
                    .col(ColumnDef::new(BlogMetas::Url).string())
                    .col(
                        ColumnDef::new(BlogMetas::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BlogMetas::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BlogPosts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlogPosts::BlogKey).string().not_null())
                    .col(ColumnDef::new(BlogPosts::Id).string().not_null())
                    .col(ColumnDef::new(BlogPosts::Slug).string().not_null())
                    .col(ColumnDef::new(BlogPosts::Title).string().not_null())
                    .col(ColumnDef::new(BlogPosts::Tags).json_binary().not_null())
                    .col(ColumnDef::new(BlogPosts::TagIndex).text().not_null())
                    .col(
                        ColumnDef::new(BlogPosts::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BlogPosts::Content).text().not_null())
                    .col(ColumnDef::new(BlogPosts::Summary).text().not_null())
                    .col(ColumnDef::new(BlogPosts::Hash).string())
                    .col(ColumnDef::new(BlogPosts::AuthorId).string())
                    .col(ColumnDef::new(BlogPosts::AuthorName).string().not_null())
                    .col(ColumnDef::new(BlogPosts::AuthorImageUrl).string())
                    .col(ColumnDef::new(BlogPosts::AuthorUrl).string())
                    .col(ColumnDef::new(BlogPosts::AuthorSourceId).string())
                    .col(ColumnDef::new(BlogPosts::ImageUrl).string())
                    .col(ColumnDef::new(BlogPosts::SourceUrl).string())
                    .col(ColumnDef::new(BlogPosts::SourceId).string())
                    .col(ColumnDef::new(BlogPosts::SearchText).text().not_null())
                    .primary_key(
                        Index::create()
                            .col(BlogPosts::BlogKey)
                            .col(BlogPosts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing order and incremental baselines.
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_published_at")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::PublishedAt)
                    .col(BlogPosts::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_key_updated_at")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::BlogKey)
                    .col(BlogPosts::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_key_slug")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::BlogKey)
                    .col(BlogPosts::Slug)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogPosts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BlogMetas::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BlogMetas {
    Table,
    BlogKey,
    Id,
    SourceId,
    Name,
    Description,
    Url,
    PublishedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BlogPosts {
    Table,
    BlogKey,
    Id,
    Slug,
    Title,
    Tags,
    TagIndex,
    PublishedAt,
    UpdatedAt,
    Content,
    Summary,
    Hash,
    AuthorId,
    AuthorName,
    AuthorImageUrl,
    AuthorUrl,
    AuthorSourceId,
    ImageUrl,
    SourceUrl,
    SourceId,
    SearchText,
}
