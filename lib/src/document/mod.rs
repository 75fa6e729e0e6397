mod frontmatter;
mod source;

pub use frontmatter::*;
pub use source::*;
