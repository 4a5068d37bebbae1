pub mod backup_core;
