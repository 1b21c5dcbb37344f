//! End-to-end tests against the public crate API.

mod stubs;

mod chat_api;
mod sandbox_render;
