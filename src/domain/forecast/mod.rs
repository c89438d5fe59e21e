pub mod config;
pub mod job_table;
pub mod qinit;
