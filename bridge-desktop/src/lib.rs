//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `StreamResolver` over the TuneBox HTTP API using `reqwest`
//! - `HistorySink` that writes entries to the tracing log
//! - `LifecycleObserver` driven by window visibility callbacks
//!
//! The media element and media session are tied to the host's audio stack
//! and window system, so they are always injected by the application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopLifecycleObserver, HttpStreamResolver};
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(HttpStreamResolver::new("https://api.tunebox.test")?);
//! let lifecycle = DesktopLifecycleObserver::new();
//! window.on_minimize(move |minimized| lifecycle.set_visible(!minimized));
//! ```

mod history;
mod lifecycle;
mod resolver;

pub use history::TracingHistorySink;
pub use lifecycle::DesktopLifecycleObserver;
pub use resolver::HttpStreamResolver;
