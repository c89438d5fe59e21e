pub mod validator;
pub mod writer;


pub use validator::check;
pub use writer::{render_definition, save_definition};
