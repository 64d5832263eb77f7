//! OpenAI-compatible wire format (groq, openai, google, openrouter).

mod request;
mod response;

pub use request::{ResponseFormatChoice, build_body, resolve_response_format};
pub use response::{TextSource, normalize, responses_text};
