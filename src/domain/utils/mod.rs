pub mod fs;
pub mod id;
