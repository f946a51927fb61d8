//! Utilities shared by the pipeline stages
//!
//! - **batch**: Bounded parallel execution that keeps input order
//! - **json**: JSON extraction, repair and parsing of model output

pub mod batch;
pub mod json;

pub use batch::{execute_ordered, TaskContext};
pub use json::{
    extract_code_block, extract_json_array, extract_json_object, parse_json_lenient, repair_json,
    strip_line_comments, strip_non_printable,
};
