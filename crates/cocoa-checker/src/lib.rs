//! # cocoa-checker
//!
//! Single-screen terminal front end for cocoa-core.
//!
//! This library provides the screen's control flow, text rendering and
//! logging setup used by the `cocoa-checker` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod app;
pub mod logging;
pub mod platform;
pub mod screen;
