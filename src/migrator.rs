use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_purchase_orders_table::Migration),
            Box::new(m20240301_000002_create_transactions_table::Migration),
            Box::new(m20240301_000003_create_inventory_movements_table::Migration),
            Box::new(m20240301_000004_create_cost_layers_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_purchase_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_purchase_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseOrders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseOrders::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::OrderNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::SupplierId).uuid().not_null())
                        .col(
                            ColumnDef::new(PurchaseOrders::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseOrders::Currency).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::Status).string().not_null())
                        .col(ColumnDef::new(PurchaseOrders::Notes).string().null())
                        .col(
                            ColumnDef::new(PurchaseOrders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseOrders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_order_number")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_orders_status")
                        .table(PurchaseOrders::Table)
                        .col(PurchaseOrders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PurchaseOrders {
        Table,
        Id,
        OrderNumber,
        SupplierId,
        TotalAmount,
        Currency,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_transactions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::ParentOrderId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::TransactionNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::InstallmentNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Status).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::TransactionDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::DueDate).date().null())
                        .col(ColumnDef::new(Transactions::Memo).string().null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transactions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Makes the allocator's retry-on-conflict strategy correct:
            // two racing allocations cannot both commit the same number.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_parent_type_no")
                        .table(Transactions::Table)
                        .col(Transactions::ParentOrderId)
                        .col(Transactions::TransactionType)
                        .col(Transactions::InstallmentNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_transaction_number")
                        .table(Transactions::Table)
                        .col(Transactions::TransactionNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_parent_order_id")
                        .table(Transactions::Table)
                        .col(Transactions::ParentOrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        ParentOrderId,
        TransactionType,
        TransactionNumber,
        InstallmentNo,
        TotalAmount,
        Status,
        TransactionDate,
        DueDate,
        Memo,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_inventory_movements_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_inventory_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InventoryMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InventoryMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::MovementType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::TotalAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::InstallmentNo)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InventoryMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_transaction_id")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inventory_movements_installment_no")
                        .table(InventoryMovements::Table)
                        .col(InventoryMovements::InstallmentNo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InventoryMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InventoryMovements {
        Table,
        Id,
        ProductId,
        MovementType,
        Quantity,
        UnitPrice,
        TotalAmount,
        InstallmentNo,
        TransactionId,
        CreatedAt,
    }
}

mod m20240301_000004_create_cost_layers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_cost_layers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CostLayers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CostLayers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CostLayers::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CostLayers::AcquiredAt).date().not_null())
                        .col(
                            ColumnDef::new(CostLayers::UnitCostExTax)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CostLayers::UnitCostIncTax)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CostLayers::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CostLayers::OriginalQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CostLayers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cost_layers_product_acquired")
                        .table(CostLayers::Table)
                        .col(CostLayers::ProductId)
                        .col(CostLayers::AcquiredAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CostLayers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CostLayers {
        Table,
        Id,
        ProductId,
        AcquiredAt,
        UnitCostExTax,
        UnitCostIncTax,
        RemainingQuantity,
        OriginalQuantity,
        CreatedAt,
    }
}
