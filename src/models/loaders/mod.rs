pub mod batch_file;
pub mod xlsx;

pub use batch_file::{
    normalize_header, validate_bytes, validate_file, write_example_template, SheetFormat,
    EXAMPLE_CSV, EXAMPLE_FILE_NAME,
};
