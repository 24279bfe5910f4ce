//! Re-locate captured quotes inside a rendered document and manage flash and
//! pinned highlights over it.

pub mod config;
pub mod controller;
pub mod document_model;
pub mod view;
