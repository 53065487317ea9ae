use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DownloadJob::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownloadJob::DownloadJobId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DownloadJob::FileName).string().not_null().unique_key())
                    .col(ColumnDef::new(DownloadJob::JobStatus).string_len(16).not_null())
                    .col(ColumnDef::new(DownloadJob::ErrorMessage).text().null())
                    .col(ColumnDef::new(DownloadJob::FileSize).big_integer().null()) // bytes
                    .col(ColumnDef::new(DownloadJob::NumberOfRows).big_integer().null())
                    .col(ColumnDef::new(DownloadJob::NumberOfColumns).integer().null())
                    .col(ColumnDef::new(DownloadJob::JsonRequest).text().null())
                    .col(
                        ColumnDef::new(DownloadJob::CreateDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DownloadJob::UpdateDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_download_job_status")
                    .table(DownloadJob::Table)
                    .col(DownloadJob::JobStatus)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DownloadJob::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DownloadJob {
    Table,
    DownloadJobId,
    FileName,
    JobStatus,
    ErrorMessage,
    FileSize,
    NumberOfRows,
    NumberOfColumns,
    JsonRequest,
    CreateDate,
    UpdateDate,
}
