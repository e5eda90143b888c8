//! Live-screen backends, one per display server.
//!
//! Each backend turns server state into [`Screen`](crate::display::Screen)
//! snapshots. Compiled in per cargo feature and target platform; see the
//! aliases in `build.rs`.

// Conditionally include each backend...
#[cfg(x11_screen)]
pub(crate) mod x11;
