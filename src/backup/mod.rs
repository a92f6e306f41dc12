// backuptool/src/backup/mod.rs
pub mod db_dump;

pub use db_dump::dump_database;
