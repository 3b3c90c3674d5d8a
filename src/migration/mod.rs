// ABOUTME: SeaORM migration module for database schema management
// ABOUTME: Creates the portal tables on startup and in test databases

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20251018_000001_create_portal_tables::Migration)]
    }
}

pub mod m20251018_000001_create_portal_tables;
