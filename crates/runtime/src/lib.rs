//! Chromium implementation of the `autoin` browser capability.
//!
//! [`launch`] finds a Chrome/Chromium executable, prepares a persistent
//! profile and returns a [`ChromiumBrowser`] driven over the DevTools protocol
//! by `chromiumoxide`.

mod browser;
pub mod discovery;
pub mod error;
mod launch;
pub mod profile;
mod script;

pub use browser::ChromiumBrowser;
pub use error::{LaunchError, Result};
pub use launch::{LaunchOptions, launch};
