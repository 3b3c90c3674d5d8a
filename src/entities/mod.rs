// ABOUTME: SeaORM entities module for the portal's persisted records
// ABOUTME: Exports users, resources, activities, certificates and access logs

pub mod access_log;
pub mod activity;
pub mod certificate;
pub mod resource;
pub mod user;

