//! Built-in plugins: HTML pages and source lint checks.
//!
//! CSS extraction and CSS minimization are emitter options and live in
//! [`crate::emit`].

pub mod html;
pub mod lint;

pub use html::{EntryAssets, load_template, render_page};
pub use lint::Linter;
