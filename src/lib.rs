//! # Tablet → display mapping 🖊️🖥️
//!
//! Graphics tablets need to remember *which* monitor they draw on - pads
//! mapped to one display of many, and pen displays doubly so - across
//! reboots, unplugs, and cables moving between ports. This crate owns that
//! association: it describes a connected [`Tablet`] from a descriptor
//! [`database`], persists the identity of its assigned display through a
//! [settings store](settings), and re-resolves that identity against the
//! currently attached [outputs](display) on demand.
//!
//! The persisted identity is the (vendor, product, serial) triple from the
//! display's EDID block, which is stable where connector names are not.
//! Resolution never caches: every call re-scans the live outputs, so
//! hot-plugging just works, and a mapping whose monitor is absent or
//! switched off resolves to "no display" instead of somewhere invisible.
//!
//! ```no_run
//! use tabletmap::{FileSettings, Tablet, XrandrScreen};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tablet = Tablet::new("/dev/input/event7")?;
//! let mut settings = FileSettings::open("/etc/tabletmap/tablets.toml")?;
//!
//! let screen = XrandrScreen::connect()?;
//! match tablet.output(&settings, &screen) {
//!     Some(output) => println!("{} draws on {}", tablet.name(), output.edid),
//!     None => println!("{} is not mapped to an attached display", tablet.name()),
//! }
//!
//! // Pin the tablet to the first active output.
//! use tabletmap::{Output as _, Screen as _};
//! if let Some(output) = screen.outputs().iter().find(|o| o.is_active()) {
//!     tablet.set_output(&mut settings, Some(output))?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod database;
pub mod device;
pub mod display;
pub mod edid;
mod platform;
pub mod settings;

pub use database::{
    database, Descriptor, DescriptorSource, Integration, IntegrationFlags, TabletDatabase, UsbId,
};
pub use device::{DeviceError, Tablet};
pub use display::{EdidInfo, Output, Screen, StaticOutput, StaticScreen};
pub use settings::{FileSettings, MemorySettings, SettingsError, SettingsStore};

#[cfg(x11_screen)]
pub use platform::x11::{X11Error, XrandrOutput, XrandrScreen};
