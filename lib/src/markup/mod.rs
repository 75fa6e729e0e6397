//! Body markup to HTML, with syntax highlighted code regions.
//!
//! HTML bodies are passed through byte-for-byte except for their code
//! regions; Markdown bodies are rendered with CommonMark first. Either way,
//! every code region is handed to [`Transformer::render_code()`].

mod escape;
mod highlight;
mod transform;

pub use escape::{escape_html, unescape_html};
pub use highlight::{Highlighter, Language, plain_div};
pub use transform::{CodeBlock, Transformer};
