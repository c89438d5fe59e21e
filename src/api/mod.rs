pub mod config_dto;
pub mod job_table_dto;
