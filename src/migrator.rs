use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_reservation_tables::Migration),
            Box::new(m20240301_000003_create_reference_counters::Migration),
        ]
    }
}

mod m20240101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Departments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Departments::Name).string().not_null())
                        .col(ColumnDef::new(Departments::Sector).string().not_null())
                        .col(ColumnDef::new(Departments::ApproverEmail).string().null())
                        .col(
                            ColumnDef::new(Departments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Facilities::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Facilities::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Facilities::Name).string().not_null())
                        .col(ColumnDef::new(Facilities::Description).string().null())
                        .col(
                            ColumnDef::new(Facilities::RequiresAssetNumber)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Facilities::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Facilities::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Venues::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Venues::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Venues::Name).string().not_null())
                        .col(ColumnDef::new(Venues::VenueGroup).string().not_null())
                        .col(ColumnDef::new(Venues::ExclusiveTo).string().null())
                        .col(
                            ColumnDef::new(Venues::SelfService)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Venues::Capacity).string().null())
                        .col(ColumnDef::new(Venues::FacilitiesAvailable).string().null())
                        .col(ColumnDef::new(Venues::ApproverEmail).string().null())
                        .col(ColumnDef::new(Venues::Timeslots).text().null())
                        .col(
                            ColumnDef::new(Venues::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Venues::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Venues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Venues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_venues_venue_group")
                        .table(Venues::Table)
                        .col(Venues::VenueGroup)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Venues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Facilities::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Departments {
        Table,
        Id,
        Name,
        Sector,
        ApproverEmail,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Facilities {
        Table,
        Id,
        Name,
        Description,
        RequiresAssetNumber,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Venues {
        Table,
        Id,
        Name,
        VenueGroup,
        ExclusiveTo,
        SelfService,
        Capacity,
        FacilitiesAvailable,
        ApproverEmail,
        Timeslots,
        Version,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_reservation_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_reservation_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReservationRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReservationRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::ReferenceNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::RunningCount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReservationRequests::Title).string().not_null())
                        .col(
                            ColumnDef::new(ReservationRequests::RequesterName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::RequesterEmail)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::DepartmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReservationRequests::VenueId).uuid().not_null())
                        .col(
                            ColumnDef::new(ReservationRequests::FromDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::ToDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReservationRequests::Layout).string().null())
                        .col(ColumnDef::new(ReservationRequests::Remarks).text().null())
                        .col(ColumnDef::new(ReservationRequests::Status).string().not_null())
                        .col(ColumnDef::new(ReservationRequests::StatusReason).text().null())
                        .col(ColumnDef::new(ReservationRequests::DecidedBy).string().null())
                        .col(
                            ColumnDef::new(ReservationRequests::DecidedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::SlotHeld)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservation_requests_venue")
                                .from(ReservationRequests::Table, ReservationRequests::VenueId)
                                .to(Venues::Table, Venues::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservation_requests_department")
                                .from(
                                    ReservationRequests::Table,
                                    ReservationRequests::DepartmentId,
                                )
                                .to(Departments::Table, Departments::Id),
                        )
                        .to_owned(),
                )
                .await?;

            // Backstop for the reference counter
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_reservation_requests_running_count")
                        .table(ReservationRequests::Table)
                        .col(ReservationRequests::RunningCount)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_reservation_requests_reference_number")
                        .table(ReservationRequests::Table)
                        .col(ReservationRequests::ReferenceNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservation_requests_venue_status")
                        .table(ReservationRequests::Table)
                        .col(ReservationRequests::VenueId)
                        .col(ReservationRequests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservation_requests_requester_email")
                        .table(ReservationRequests::Table)
                        .col(ReservationRequests::RequesterEmail)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReservationFacilityItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReservationFacilityItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFacilityItems::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFacilityItems::FacilityId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFacilityItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationFacilityItems::AssetNumber)
                                .string()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservation_facility_items_request")
                                .from(
                                    ReservationFacilityItems::Table,
                                    ReservationFacilityItems::RequestId,
                                )
                                .to(ReservationRequests::Table, ReservationRequests::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReservationParticipants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReservationParticipants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationParticipants::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationParticipants::Name)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationParticipants::ParticipantType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationParticipants::Organization)
                                .string()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservation_participants_request")
                                .from(
                                    ReservationParticipants::Table,
                                    ReservationParticipants::RequestId,
                                )
                                .to(ReservationRequests::Table, ReservationRequests::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReservationAttachments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReservationAttachments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::FileName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::ContentType)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::SizeBytes)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::StorageUrl)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReservationAttachments::UploadedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservation_attachments_request")
                                .from(
                                    ReservationAttachments::Table,
                                    ReservationAttachments::RequestId,
                                )
                                .to(ReservationRequests::Table, ReservationRequests::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReservationAttachments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ReservationParticipants::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ReservationFacilityItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ReservationRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Venues {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Departments {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum ReservationRequests {
        Table,
        Id,
        ReferenceNumber,
        RunningCount,
        Title,
        RequesterName,
        RequesterEmail,
        DepartmentId,
        VenueId,
        FromDate,
        ToDate,
        Layout,
        Remarks,
        Status,
        StatusReason,
        DecidedBy,
        DecidedAt,
        SlotHeld,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ReservationFacilityItems {
        Table,
        Id,
        RequestId,
        FacilityId,
        Quantity,
        AssetNumber,
    }

    #[derive(DeriveIden)]
    enum ReservationParticipants {
        Table,
        Id,
        RequestId,
        Name,
        ParticipantType,
        Organization,
    }

    #[derive(DeriveIden)]
    enum ReservationAttachments {
        Table,
        Id,
        RequestId,
        FileName,
        ContentType,
        SizeBytes,
        StorageUrl,
        UploadedAt,
    }
}

mod m20240301_000003_create_reference_counters {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_reference_counters"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReferenceCounters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReferenceCounters::Name)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReferenceCounters::Value)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            // Start from whatever requests already exist.
            manager
                .get_connection()
                .execute_unprepared(
                    "INSERT INTO reference_counters (name, value) \
                     SELECT 'reservation_requests', COALESCE(MAX(running_count), 0) \
                     FROM reservation_requests",
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReferenceCounters::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ReferenceCounters {
        Table,
        Name,
        Value,
    }
}
