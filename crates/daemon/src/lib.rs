//! Session keeper daemon for `autoin`.
//!
//! Loads a [`config::Config`], keeps one logical session per configured term
//! alive through a shared browser and writes each fresh cookie with
//! [`sink::CookieFileSink`].

pub mod config;
pub mod keeper;
pub mod logging;
pub mod sink;
