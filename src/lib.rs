// Behavior graph extraction and reduction over app knowledge graphs.

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod ports;
