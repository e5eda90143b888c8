//! `RandR`-backed screen enumeration.
//!
//! Asks the X server for the currently connected outputs, reads each one's
//! `EDID` output property for identity, and derives activity from whether
//! the output's crtc drives a mode.

use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::display::{EdidInfo, Output, Screen};
use crate::edid;

#[derive(thiserror::Error, Debug)]
pub enum X11Error {
    #[error("cannot connect to the X server: {0}")]
    Connect(#[from] x11rb::errors::ConnectError),
    #[error(transparent)]
    Connection(#[from] x11rb::errors::ConnectionError),
    #[error(transparent)]
    Reply(#[from] x11rb::errors::ReplyError),
}

/// One connected output, as seen at snapshot time.
#[derive(Clone, Debug)]
pub struct XrandrOutput {
    /// Connector name as reported by the server (`HDMI-1`, `eDP-1`, ...).
    /// Identity for matching purposes is `edid`, not this - connector names
    /// shuffle when cables move.
    pub name: String,
    pub edid: EdidInfo,
    pub active: bool,
}

impl Output for XrandrOutput {
    fn edid(&self) -> &EdidInfo {
        &self.edid
    }
    fn is_active(&self) -> bool {
        self.active
    }
}

/// Snapshot of the connected `RandR` outputs.
///
/// Nothing inside watches for hot-plug events - take a fresh snapshot per
/// lookup with [`XrandrScreen::connect`].
#[derive(Debug, Default)]
pub struct XrandrScreen {
    outputs: Vec<XrandrOutput>,
}

impl Screen for XrandrScreen {
    type Output = XrandrOutput;
    fn outputs(&self) -> &[XrandrOutput] {
        &self.outputs
    }
}

impl XrandrScreen {
    /// Connect to the default X display and enumerate the connected
    /// outputs, in server order.
    ///
    /// Outputs whose `EDID` property is absent or unparseable are listed
    /// with an [unset](EdidInfo::unset) identity - they exist, they just
    /// can't be matched against a persisted triple.
    ///
    /// # Errors
    /// Connection or protocol errors from the server.
    pub fn connect() -> Result<Self, X11Error> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;
        let resources = conn.randr_get_screen_resources_current(root)?.reply()?;
        let edid_atom = conn.intern_atom(false, b"EDID")?.reply()?.atom;

        let mut outputs = Vec::new();
        for output in resources.outputs {
            let info = conn
                .randr_get_output_info(output, resources.config_timestamp)?
                .reply()?;
            if info.connection != randr::Connection::CONNECTED {
                continue;
            }
            let name = String::from_utf8_lossy(&info.name).into_owned();

            let edid = read_edid_property(&conn, output, edid_atom).map_or_else(
                EdidInfo::unset,
                |bytes| {
                    edid::parse(&bytes).unwrap_or_else(|e| {
                        log::warn!("unusable EDID on output `{name}`: {e}");
                        EdidInfo::unset()
                    })
                },
            );

            // Lit means: assigned a crtc, and that crtc drives a mode.
            let active = info.crtc != x11rb::NONE && {
                let crtc = conn
                    .randr_get_crtc_info(info.crtc, resources.config_timestamp)?
                    .reply()?;
                crtc.mode != x11rb::NONE
            };

            outputs.push(XrandrOutput { name, edid, active });
        }
        Ok(Self { outputs })
    }
}

/// Raw `EDID` property bytes, if the output carries any.
fn read_edid_property(
    conn: &RustConnection,
    output: randr::Output,
    edid_atom: Atom,
) -> Option<Vec<u8>> {
    let prop = conn
        .randr_get_output_property(output, edid_atom, x11rb::NONE, 0, u32::MAX, false, false)
        .ok()?
        .reply()
        .ok()?;
    (prop.format == 8 && !prop.data.is_empty()).then_some(prop.data)
}
