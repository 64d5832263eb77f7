//! Anthropic messages wire format.

mod request;
mod response;
mod utils;

pub use request::build_body;
pub use response::{extract_reasoning_content, normalize};
pub use utils::{convert_tool_choice, convert_tools};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
