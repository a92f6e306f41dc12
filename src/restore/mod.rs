// backuptool/src/restore/mod.rs
pub mod db_restore;

pub use db_restore::restore_database;
