// ABOUTME: Initial migration creating users, resources, activities, certificates and access_logs
// ABOUTME: Adds the secondary indexes used by listing and coalescing queries

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::ProfilePicture).text())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null().default(true))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Resources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Resources::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Resources::Title).string().not_null())
                    .col(ColumnDef::new(Resources::Description).text().not_null().default(""))
                    .col(ColumnDef::new(Resources::FileName).string().not_null().unique_key())
                    .col(ColumnDef::new(Resources::FileSize).big_integer().not_null())
                    .col(ColumnDef::new(Resources::FileType).string().not_null())
                    .col(ColumnDef::new(Resources::UploadedBy).integer().not_null())
                    .col(ColumnDef::new(Resources::UploadedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Resources::Branch).string().not_null())
                    .col(ColumnDef::new(Resources::Subject).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_resources_uploaded_by")
                            .from(Resources::Table, Resources::UploadedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_resources_branch")
                    .table(Resources::Table)
                    .col(Resources::Branch)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activities::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Activities::StudentId).integer().not_null())
                    .col(ColumnDef::new(Activities::Category).string().not_null())
                    .col(ColumnDef::new(Activities::Title).string().not_null())
                    .col(ColumnDef::new(Activities::Description).text())
                    .col(ColumnDef::new(Activities::StartDate).date())
                    .col(ColumnDef::new(Activities::EndDate).date())
                    .col(ColumnDef::new(Activities::Credits).integer())
                    .col(ColumnDef::new(Activities::CertificateFile).string())
                    .col(ColumnDef::new(Activities::Status).string().not_null())
                    .col(ColumnDef::new(Activities::ApprovedBy).integer())
                    .col(ColumnDef::new(Activities::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Activities::RejectionReason).text())
                    .col(ColumnDef::new(Activities::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_student_id")
                            .from(Activities::Table, Activities::StudentId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activities_status")
                    .table(Activities::Table)
                    .col(Activities::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Certificates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Certificates::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Certificates::UserId).integer().not_null())
                    .col(ColumnDef::new(Certificates::Title).string().not_null())
                    .col(ColumnDef::new(Certificates::Description).text())
                    .col(ColumnDef::new(Certificates::Type).string())
                    .col(ColumnDef::new(Certificates::FilePath).string().not_null())
                    .col(ColumnDef::new(Certificates::ContentType).string().not_null())
                    .col(ColumnDef::new(Certificates::UploadDate).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_certificates_user_id")
                            .from(Certificates::Table, Certificates::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AccessLogs::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(AccessLogs::StudentId).integer().not_null())
                    .col(ColumnDef::new(AccessLogs::ResourceId).integer().not_null())
                    .col(ColumnDef::new(AccessLogs::AccessedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(AccessLogs::AccessType).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_logs_student_id")
                            .from(AccessLogs::Table, AccessLogs::StudentId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_logs_resource_id")
                            .from(AccessLogs::Table, AccessLogs::ResourceId)
                            .to(Resources::Table, Resources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_access_logs_student_resource")
                    .table(AccessLogs::Table)
                    .col(AccessLogs::StudentId)
                    .col(AccessLogs::ResourceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessLogs::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Certificates::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Resources::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Password,
    Role,
    ProfilePicture,
    CreatedAt,
    UpdatedAt,
    LastLogin,
    IsActive,
}

#[derive(DeriveIden)]
enum Resources {
    Table,
    Id,
    Title,
    Description,
    FileName,
    FileSize,
    FileType,
    UploadedBy,
    UploadedAt,
    Branch,
    Subject,
}

#[derive(DeriveIden)]
enum Activities {
    Table,
    Id,
    StudentId,
    Category,
    Title,
    Description,
    StartDate,
    EndDate,
    Credits,
    CertificateFile,
    Status,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Certificates {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Type,
    FilePath,
    ContentType,
    UploadDate,
}

#[derive(DeriveIden)]
enum AccessLogs {
    Table,
    Id,
    StudentId,
    ResourceId,
    AccessedAt,
    AccessType,
}
