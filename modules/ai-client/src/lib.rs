pub mod claude;
pub mod error;
pub mod schema;
pub mod util;

pub use claude::{Claude, ContentPart, StructuredReply};
pub use error::AiError;
pub use schema::StructuredOutput;
pub use util::{strip_code_blocks, truncate_to_char_boundary};
