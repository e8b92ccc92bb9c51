// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod models;
pub mod query;
pub mod retention_worker;
pub mod routes;
pub mod usage_repo;
pub mod version;
pub mod widget;
