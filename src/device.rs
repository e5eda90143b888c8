//! # Tablet devices
//!
//! A [`Tablet`] ties together a device node, its entry in the descriptor
//! [`database`](crate::database), and the persisted settings that say which
//! display it draws on.
//!
//! The display association is the interesting part. What gets persisted is
//! the EDID identity triple of the chosen monitor, not a connector name, so
//! the mapping survives reboots, port changes and unplugs. Resolving it
//! back ([`Tablet::output`]) re-matches the stored triple against the live
//! outputs on every call and insists the match is actually lit - a stored
//! mapping to a monitor that is unplugged or off resolves to nothing rather
//! than to a screen nobody can see.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::{self, Descriptor, DescriptorSource, Integration, IntegrationFlags};
use crate::display::{EdidInfo, Output, Screen};
use crate::settings::{SettingsError, SettingsStore};

#[derive(thiserror::Error, Debug)]
pub enum DeviceError {
    /// No descriptor in the database matches the device file. Without
    /// metadata there is nothing to configure, so construction fails
    /// instead of producing a half-usable device.
    #[error("tablet description not found for `{}`", .0.display())]
    NotFound(PathBuf),
}

/// A connected graphics tablet.
///
/// Holds only static state (node path, descriptor, settings key); all
/// display and settings access goes through the store and screen arguments
/// of the individual calls, so a `Tablet` never goes stale.
#[derive(Debug, Clone)]
pub struct Tablet {
    node: PathBuf,
    descriptor: Arc<Descriptor>,
    settings_key: String,
}

impl Tablet {
    /// Describe the device behind `node` using the process-wide
    /// [`database()`](crate::database::database).
    ///
    /// # Errors
    /// [`DeviceError::NotFound`] if no descriptor matches `node`.
    pub fn new(node: impl Into<PathBuf>) -> Result<Self, DeviceError> {
        Self::with_database(database::database(), node)
    }

    /// As [`Tablet::new`], with an explicit descriptor source.
    ///
    /// # Errors
    /// [`DeviceError::NotFound`] if the source doesn't know the hardware.
    pub fn with_database(
        db: &impl DescriptorSource,
        node: impl Into<PathBuf>,
    ) -> Result<Self, DeviceError> {
        let node = node.into();
        let Some(descriptor) = db.lookup(&node) else {
            return Err(DeviceError::NotFound(node));
        };
        Ok(Self::from_descriptor(descriptor, node))
    }

    /// Build directly from a descriptor, skipping any lookup.
    #[must_use]
    pub fn from_descriptor(descriptor: Arc<Descriptor>, node: impl Into<PathBuf>) -> Self {
        let settings_key = descriptor
            .usb
            .first()
            .map_or_else(|| name_key(&descriptor.name), ToString::to_string);
        Self {
            node: node.into(),
            descriptor,
            settings_key,
        }
    }

    /// Marketing name of the model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Device file this tablet was constructed from.
    #[must_use]
    pub fn node(&self) -> &Path {
        &self.node
    }

    /// Full model metadata.
    #[must_use]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn integration(&self) -> IntegrationFlags {
        self.descriptor.integration
    }

    /// [`IntegrationFlags`] reduced to a single category.
    #[must_use]
    pub fn integration_category(&self) -> Integration {
        self.descriptor.integration.into()
    }

    /// Whether the hardware supports 180° rotation for left-handed use.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.descriptor.reversible
    }

    /// Hardware ids of the styli this model supports.
    #[must_use]
    pub fn supported_styli(&self) -> &[u32] {
        &self.descriptor.styli
    }

    /// Icon for this device, chosen by integration.
    #[must_use]
    pub fn icon_name(&self) -> &'static str {
        match self.integration_category() {
            Integration::System => "tablet-pc",
            Integration::Display => "tablet-display",
            Integration::Standalone => "tablet",
        }
    }

    /// Key under which a [`SettingsStore`] files this device: the USB id in
    /// `vvvv:pppp` form when known, else the sanitized model name.
    #[must_use]
    pub fn settings_key(&self) -> &str {
        &self.settings_key
    }

    /// The output this tablet is mapped to, if that display is currently
    /// attached *and* active.
    ///
    /// The persisted identity is re-matched against `screen` on every call;
    /// nothing is cached, so hot-plug changes are picked up for free.
    /// Returns `None` when the tablet is unmapped, when no attached output
    /// carries the persisted identity, or when the matching output has no
    /// current mode. A malformed persisted record (anything but three
    /// slots) also resolves to `None`, with an error logged - corrupt
    /// settings must never take the caller down.
    #[must_use]
    pub fn output<'s, St, Sc>(&self, settings: &St, screen: &'s Sc) -> Option<&'s Sc::Output>
    where
        St: SettingsStore + ?Sized,
        Sc: Screen + ?Sized,
    {
        let output = self.find_output(settings, screen)?;
        if !output.is_active() {
            log::debug!("output for `{}` is not active", self.name());
            return None;
        }
        Some(output)
    }

    /// Map this tablet onto `output`, or clear the mapping with `None`.
    ///
    /// The persisted record is overwritten unconditionally. The output is
    /// *not* required to be attached or active: mapping to a currently
    /// disconnected monitor is legitimate, the binding takes effect when it
    /// comes back.
    ///
    /// # Errors
    /// Whatever the store raises on write.
    pub fn set_output(
        &self,
        settings: &mut (impl SettingsStore + ?Sized),
        output: Option<&dyn Output>,
    ) -> Result<(), SettingsError> {
        let triple = output.map_or_else(EdidInfo::unset, |output| output.edid().clone());
        settings.set_display_triple(&self.settings_key, &triple)
    }

    /// Identity-matched output, active or not.
    fn find_output<'s, St, Sc>(&self, settings: &St, screen: &'s Sc) -> Option<&'s Sc::Output>
    where
        St: SettingsStore + ?Sized,
        Sc: Screen + ?Sized,
    {
        let triple = match <[String; 3]>::try_from(settings.display_triple(&self.settings_key)) {
            Ok([vendor, product, serial]) => EdidInfo {
                vendor,
                product,
                serial,
            },
            Err(stored) => {
                log::error!(
                    "expected display entry for `{}` to hold 3 values; got {}",
                    self.settings_key,
                    stored.len()
                );
                return None;
            }
        };
        // Any empty slot means unmapped. Common state, not worth a log line.
        if !triple.is_complete() {
            return None;
        }
        find_output_by_edid(screen.outputs(), &triple)
    }
}

/// First output in enumeration order whose identity equals `triple`.
///
/// Real hardware should never present two outputs with identical triples;
/// if it does anyway, enumeration order is the tie-break.
fn find_output_by_edid<'s, O: Output>(outputs: &'s [O], triple: &EdidInfo) -> Option<&'s O> {
    let found = outputs.iter().find(|output| {
        let candidate = output.edid();
        log::debug!("checking for match between {triple} and {candidate}");
        candidate == triple
    });
    if found.is_none() {
        log::debug!("did not find a matching output for EDID {triple}");
    }
    found
}

/// Settings-key fallback for descriptors without a USB id.
fn name_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{TabletDatabase, UsbId};
    use crate::display::{StaticOutput, StaticScreen};
    use crate::settings::MemorySettings;
    use smallvec::smallvec;

    fn descriptor(integration: IntegrationFlags) -> Arc<Descriptor> {
        Arc::new(Descriptor {
            name: "Example Drawpad M".into(),
            integration,
            reversible: true,
            styli: smallvec![0x802, 0x804],
            usb: smallvec![UsbId {
                vid: 0x056a,
                pid: 0x0357,
            }],
        })
    }

    fn tablet() -> Tablet {
        Tablet::from_descriptor(descriptor(IntegrationFlags::empty()), "/dev/input/event7")
    }

    fn triple(vendor: &str, product: &str, serial: &str) -> EdidInfo {
        EdidInfo {
            vendor: vendor.into(),
            product: product.into(),
            serial: serial.into(),
        }
    }

    fn output(edid: EdidInfo, active: bool) -> StaticOutput {
        StaticOutput { edid, active }
    }

    #[test]
    fn construction_fails_without_a_descriptor() {
        let db = TabletDatabase::new();
        let err = Tablet::with_database(&db, "/dev/input/event7").unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(path) if path.ends_with("event7")));
    }

    #[test]
    fn metadata_accessors() {
        let tablet = tablet();
        assert_eq!(tablet.name(), "Example Drawpad M");
        assert_eq!(tablet.node(), Path::new("/dev/input/event7"));
        assert!(tablet.is_reversible());
        assert_eq!(tablet.supported_styli(), [0x802, 0x804]);
        assert_eq!(tablet.settings_key(), "056a:0357");
    }

    #[test]
    fn settings_key_falls_back_to_name() {
        let descriptor = Arc::new(Descriptor {
            name: "Serial Pad (rev 2)".into(),
            integration: IntegrationFlags::empty(),
            reversible: false,
            styli: smallvec![],
            usb: smallvec![],
        });
        let tablet = Tablet::from_descriptor(descriptor, "/dev/ttyS0");
        assert_eq!(tablet.settings_key(), "serial-pad--rev-2-");
    }

    #[test]
    fn icon_tracks_integration() {
        let by_flags = |flags| {
            Tablet::from_descriptor(descriptor(flags), "/dev/input/event7").icon_name()
        };
        assert_eq!(by_flags(IntegrationFlags::empty()), "tablet");
        assert_eq!(by_flags(IntegrationFlags::DISPLAY), "tablet-display");
        assert_eq!(by_flags(IntegrationFlags::SYSTEM), "tablet-pc");
        // System integration wins when a convertible reports both.
        assert_eq!(
            by_flags(IntegrationFlags::SYSTEM | IntegrationFlags::DISPLAY),
            "tablet-pc"
        );
    }

    #[test]
    fn resolves_the_unique_active_match() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        let screen = StaticScreen {
            outputs: vec![
                output(triple("HP", "X1", "S2"), true),
                output(triple("Dell", "P2", "S100"), true),
            ],
        };
        tablet
            .set_output(&mut settings, Some(&screen.outputs[1]))
            .unwrap();

        let resolved = tablet.output(&settings, &screen).unwrap();
        assert!(std::ptr::eq(resolved, &screen.outputs[1]));
    }

    #[test]
    fn unmapped_resolves_none_regardless_of_outputs() {
        let tablet = tablet();
        let settings = MemorySettings::new();
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        assert!(tablet.output(&settings, &screen).is_none());
    }

    #[test]
    fn partially_empty_triple_is_still_unmapped() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        settings.set_raw_display(
            tablet.settings_key(),
            vec!["Dell".into(), "P2".into(), String::new()],
        );
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        assert!(tablet.output(&settings, &screen).is_none());
    }

    #[test]
    fn bind_then_resolve_round_trips() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        tablet
            .set_output(&mut settings, Some(&screen.outputs[0]))
            .unwrap();
        assert_eq!(
            settings.display_triple(tablet.settings_key()),
            vec!["Dell", "P2", "S100"]
        );
        let resolved = tablet.output(&settings, &screen).unwrap();
        assert!(std::ptr::eq(resolved, &screen.outputs[0]));
    }

    #[test]
    fn unbind_writes_the_empty_triple() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        tablet
            .set_output(&mut settings, Some(&screen.outputs[0]))
            .unwrap();
        tablet.set_output(&mut settings, None).unwrap();

        assert_eq!(
            settings.display_triple(tablet.settings_key()),
            vec!["", "", ""]
        );
        assert!(tablet.output(&settings, &screen).is_none());
    }

    #[test]
    fn binding_a_detached_output_is_allowed() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        let detached = output(triple("Dell", "P2", "S100"), false);
        // Nothing attached at bind time at all.
        tablet
            .set_output(&mut settings, Some(&detached))
            .unwrap();
        assert_eq!(
            settings.display_triple(tablet.settings_key()),
            vec!["Dell", "P2", "S100"]
        );
        // ...and the mapping resolves once the monitor is back and lit.
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        assert!(tablet.output(&settings, &screen).is_some());
    }

    #[test]
    fn malformed_vector_resolves_none() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), true)],
        };
        for raw in [
            vec![],
            vec!["Dell".into(), "P2".into()],
            vec!["Dell".into(), "P2".into(), "S100".into(), "extra".into()],
        ] {
            settings.set_raw_display(tablet.settings_key(), raw);
            assert!(tablet.output(&settings, &screen).is_none());
        }
    }

    #[test]
    fn inactive_match_resolves_none() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        settings
            .set_display_triple(tablet.settings_key(), &triple("Dell", "P2", "S100"))
            .unwrap();
        let screen = StaticScreen {
            outputs: vec![output(triple("Dell", "P2", "S100"), false)],
        };
        assert!(tablet.output(&settings, &screen).is_none());
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        settings
            .set_display_triple(tablet.settings_key(), &triple("Dell", "P2", "S100"))
            .unwrap();
        let screen = StaticScreen {
            outputs: vec![
                output(triple("DELL", "P2", "S100"), true),
                output(triple("Dell", "P2", "s100"), true),
            ],
        };
        assert!(tablet.output(&settings, &screen).is_none());
    }

    #[test]
    fn first_of_the_scan_order_wins() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        settings
            .set_display_triple(tablet.settings_key(), &triple("Dell", "P2", "S100"))
            .unwrap();
        // Two outputs claiming the same identity - not a real hardware
        // scenario, but the tie-break must stay put.
        let screen = StaticScreen {
            outputs: vec![
                output(triple("Dell", "P2", "S100"), true),
                output(triple("Dell", "P2", "S100"), true),
            ],
        };
        let resolved = tablet.output(&settings, &screen).unwrap();
        assert!(std::ptr::eq(resolved, &screen.outputs[0]));
    }

    #[test]
    fn scan_skips_non_matching_outputs() {
        let tablet = tablet();
        let mut settings = MemorySettings::new();
        settings
            .set_display_triple(tablet.settings_key(), &triple("Dell", "P2", "S100"))
            .unwrap();
        let screen = StaticScreen {
            outputs: vec![
                output(triple("Dell", "P2", "S100"), true),
                output(triple("HP", "X1", "S2"), true),
            ],
        };
        let resolved = tablet.output(&settings, &screen).unwrap();
        assert!(std::ptr::eq(resolved, &screen.outputs[0]));
    }
}
