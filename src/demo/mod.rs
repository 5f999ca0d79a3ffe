//! Demo components
//!
//! Servlets and filters wired up by the sample `config.toml`. They double as
//! usage examples for the servlet API.

mod filters;
mod servlets;

pub use filters::{PoweredBy, SecuredArea};
pub use servlets::{ChunkedWithDelay, Index, SessionCounter, Upload};

use crate::servlet::ComponentRegistry;

/// Register every demo component under its `demo.*` class identifier
pub fn register(registry: &mut ComponentRegistry) {
    registry.register_servlet("demo.Index", || Index);
    registry.register_servlet("demo.SessionCounter", || SessionCounter);
    registry.register_servlet("demo.Upload", || Upload);
    registry.register_servlet("demo.ChunkedWithDelay", ChunkedWithDelay::default);
    registry.register_filter("demo.PoweredBy", || PoweredBy);
    registry.register_filter("demo.SecuredArea", || SecuredArea);
}

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
