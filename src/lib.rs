pub mod app;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod merge;
pub mod output;
pub mod report;
pub mod sequences;
pub mod split;
pub mod store;
pub mod table;
