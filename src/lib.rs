//! Embedded servlet-style HTTP server
//!
//! Requests are resolved to a routing context and a servlet mapping, run
//! through the matching filters and the servlet, then finalized (session
//! cookie, default headers, upload cleanup). Paths no servlet claims fall
//! through to an optional static file directory.

pub mod config;
pub mod demo;
pub mod error;
pub mod http;
pub mod logger;
pub mod resource;
pub mod routing;
pub mod server;
pub mod servlet;
