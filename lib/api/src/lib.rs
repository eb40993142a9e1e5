//! HTTP interface for simrec recommendations

pub mod rest;

pub use rest::RestApi;
