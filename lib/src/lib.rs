#![doc = svgbobdoc::transform!(
//! A library that renders a directory of front-matter tagged posts into a
//! static site.
//!
//! # Overview
//!
//! Every post is a document: a `---` delimited block of `key: value` metadata
//! followed by an HTML (or Markdown) body. Every document names a _layout_, a
//! template with `{{ slot }}` insertion points that may itself be wrapped by a
//! parent layout. A build pushes each document through the following stages:
//!
//! ```svgbob
//!  +-----------+   +-------------+   +-----------+   +----------+
//!  | document  +-->| front matter+-->| transform +-->| schedule |  parallel,
//!  | (source)  |   | (metadata)  |   | (body)    |   | (instant,|  per document
//!  +-----------+   +-------------+   +-----------+   | permalink|
//!                                                    +----+-----+
//!                                                         |
//!                       +---------------------------------+
//!                       v
//!                 +-----------+   +-----------+   +-----------+
//!                 |  ledger   +-->|  layout   +-->|  write    |  parallel,
//!                 | (order,   |   | (compose) |   | (output   |  per page
//!                 | collision)|   +-----------+   |  tree)    |
//!                 +-----------+                   +-----------+
//!                   serial
//! ```
//!
//! In words:
//!
//!   1. [`document`] splits the front matter from the body.
//!   2. [`markup`] converts the body into HTML and highlights code regions.
//!   3. [`schedule`] resolves the publish instant and the permalink.
//!   4. [`site::Ledger`], the only owner of cross-document state, orders the
//!      posts and rejects permalink collisions.
//!   5. [`layout`] wraps each body in its layout chain.
//!   6. [`site`] writes one page per post plus an index.
//!
//! Steps 1-3 and 5-6 run on the rayon pool; step 4 is a single-threaded
//! reduction, so the result never depends on which worker finished first.
//! Whether one bad document aborts the build or is merely reported is decided
//! by [`Config::fail_fast`].
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod config;
pub mod document;
pub mod markup;
pub mod layout;
pub mod schedule;
pub mod site;

pub use config::Config;
pub use error::{Error, ErrorKind, Failure, Subject};
pub use site::{build, Rendering, RenderedPage, Site};

pub use rayon;
