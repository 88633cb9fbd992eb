//! Terminal output: progress bars and header views.

pub mod progress;
mod view;

pub use view::{HeaderView, render_json, render_text};
