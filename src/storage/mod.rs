pub mod error;
pub mod json_files;
pub mod output_path;

pub use error::PersistError;
pub use json_files::{JsonFilePersister, read_documents};
pub use output_path::output_path;
