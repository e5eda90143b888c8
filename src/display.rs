//! # Displays
//!
//! The monitors a tablet can be mapped onto. A display is identified by the
//! (vendor, product, serial) triple from its EDID block - unlike connector
//! names, the triple stays put when a monitor moves to a different port or
//! the machine reboots.
//!
//! Live enumeration is abstracted behind [`Screen`], with one implementation
//! per display server (see [`XrandrScreen`](crate::XrandrScreen)) plus
//! [`StaticScreen`] for tests and embedders that already hold output data.

/// Identity of a display, as read from its EDID block.
///
/// An empty string in any field means the display did not report that field.
/// Only [complete](EdidInfo::is_complete) triples are meaningful to match on;
/// the all-[unset](EdidInfo::unset) triple doubles as "no display".
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct EdidInfo {
    /// Three-letter PNP id of the manufacturer, e.g. `DEL`.
    pub vendor: String,
    /// Model name from the product-name descriptor.
    pub product: String,
    /// Serial text from the serial-number descriptor.
    pub serial: String,
}

impl EdidInfo {
    /// The all-empty triple, denoting "no display".
    #[must_use]
    pub const fn unset() -> Self {
        Self {
            vendor: String::new(),
            product: String::new(),
            serial: String::new(),
        }
    }
    /// Whether all three fields are populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.vendor.is_empty() && !self.product.is_empty() && !self.serial.is_empty()
    }
}

impl std::fmt::Display for EdidInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}','{}','{}'", self.vendor, self.product, self.serial)
    }
}

/// A currently attached display output.
///
/// Implementations are transient snapshots of server state - enumerate
/// afresh per lookup rather than holding a handle across hot-plugs.
pub trait Output {
    /// Identity triple of this output.
    fn edid(&self) -> &EdidInfo;
    /// Whether the output currently drives a mode. A monitor that is
    /// attached but switched off (or not part of the layout) reports `false`.
    fn is_active(&self) -> bool;
}

/// A source of the currently attached outputs.
pub trait Screen {
    type Output: Output;
    /// All attached outputs. Order is meaningful: identity collisions are
    /// broken by returning the first match in this order.
    fn outputs(&self) -> &[Self::Output];
}

/// An [`Output`] described by plain values.
#[derive(Clone, Debug, Default)]
pub struct StaticOutput {
    pub edid: EdidInfo,
    pub active: bool,
}

impl Output for StaticOutput {
    fn edid(&self) -> &EdidInfo {
        &self.edid
    }
    fn is_active(&self) -> bool {
        self.active
    }
}

/// A fixed set of outputs. Use when display state comes from somewhere this
/// crate doesn't speak to - a compositor IPC, a test, a config file.
#[derive(Clone, Debug, Default)]
pub struct StaticScreen {
    pub outputs: Vec<StaticOutput>,
}

impl Screen for StaticScreen {
    type Output = StaticOutput;
    fn outputs(&self) -> &[StaticOutput] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness() {
        assert!(!EdidInfo::unset().is_complete());
        let mut info = EdidInfo {
            vendor: "DEL".into(),
            product: "P2419H".into(),
            serial: "ABC123".into(),
        };
        assert!(info.is_complete());
        info.serial.clear();
        assert!(!info.is_complete());
    }

    #[test]
    fn display_quotes_every_field() {
        let info = EdidInfo {
            vendor: "DEL".into(),
            product: "P2419H".into(),
            serial: String::new(),
        };
        assert_eq!(info.to_string(), "'DEL','P2419H',''");
    }
}
