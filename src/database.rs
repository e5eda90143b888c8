//! # The tablet descriptor database
//!
//! Static hardware metadata - marketing name, how the pad is physically
//! integrated, which styli it ships with - is not something the kernel
//! reports, so it comes from definition files instead: one TOML file per
//! model in a data directory, matched to a live device by USB id.
//!
//! ```toml
//! name = "Example Drawpad M"
//! usb = ["056a:0357"]
//! integration = ["display"]
//! reversible = true
//! styli = [0x802, 0x804]
//! ```
//!
//! Most callers never touch this module directly: [`Tablet::new`](crate::Tablet::new)
//! consults the process-wide [`database()`], loaded once on first use.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use smallvec::SmallVec;

/// Definition directory baked in at compile time.
pub const DATA_DIR: &str = "/usr/share/tabletmap/tablets";
/// Environment override for [`DATA_DIR`], read once at first [`database()`] use.
pub const DATA_DIR_ENV: &str = "TABLETMAP_DATA_DIR";

bitflags::bitflags! {
    /// How a tablet is physically integrated with the hardware around it.
    ///
    /// An empty set is a standalone peripheral sitting on the desk.
    #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
    pub struct IntegrationFlags: u8 {
        /// Built into a display; drawing happens directly on the screen.
        const DISPLAY = 1;
        /// Built into the system chassis, as on convertibles and tablet PCs.
        const SYSTEM = 2;
    }
}

/// [`IntegrationFlags`] reduced to a single category.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::AsRefStr, strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Integration {
    /// An external peripheral.
    #[default]
    Standalone,
    /// Built into the system chassis.
    System,
    /// Built into a display with a drawing surface.
    Display,
}

impl From<IntegrationFlags> for Integration {
    fn from(flags: IntegrationFlags) -> Self {
        if flags.contains(IntegrationFlags::SYSTEM) {
            Self::System
        } else if flags.contains(IntegrationFlags::DISPLAY) {
            Self::Display
        } else {
            Self::Standalone
        }
    }
}

/// USB vendor/product pair identifying a tablet model.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct UsbId {
    /// Vendor ID
    pub vid: u16,
    /// Product ID
    pub pid: u16,
}

/// Error parsing the `vvvv:pppp` form of a [`UsbId`].
#[derive(thiserror::Error, Debug)]
#[error("expected a `vvvv:pppp` hex pair, got `{0}`")]
pub struct UsbIdParseError(String);

impl std::str::FromStr for UsbId {
    type Err = UsbIdParseError;
    /// Parse the `vvvv:pppp` hex form used by definition files and sysfs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || UsbIdParseError(s.into());
        let (vid, pid) = s.split_once(':').ok_or_else(err)?;
        Ok(Self {
            vid: u16::from_str_radix(vid, 16).map_err(|_| err())?,
            pid: u16::from_str_radix(pid, 16).map_err(|_| err())?,
        })
    }
}

impl std::fmt::Display for UsbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vid, self.pid)
    }
}

/// Static metadata for one tablet model.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Marketing name, e.g. `Wacom Intuos Pro S`.
    pub name: String,
    pub integration: IntegrationFlags,
    /// Whether the hardware supports being used rotated 180°, for
    /// left-handed setups.
    pub reversible: bool,
    /// Hardware ids of the styli usable with this model.
    pub styli: SmallVec<[u32; 8]>,
    /// USB device ids this descriptor matches. May be empty for
    /// descriptors registered by hand.
    pub usb: SmallVec<[UsbId; 2]>,
}

/// Source of static tablet metadata, keyed by device file.
///
/// [`TabletDatabase`] is the stock implementation; embedders with their own
/// hardware inventory can substitute it at
/// [`Tablet::with_database`](crate::Tablet::with_database).
pub trait DescriptorSource {
    /// Descriptor for the device behind `device_file`, or `None` if the
    /// hardware is unknown.
    fn lookup(&self, device_file: &Path) -> Option<Arc<Descriptor>>;
}

/// An index of [`Descriptor`]s over the USB ids they match.
#[derive(Debug, Default)]
pub struct TabletDatabase {
    by_usb: HashMap<UsbId, Arc<Descriptor>>,
}

#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    /// The definition directory itself could not be read. Individual broken
    /// files inside a readable directory are skipped, not raised.
    #[error("cannot read definition directory `{}`: {source}", .dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TabletDatabase {
    /// An empty database; every lookup misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.tablet` file in `dir`.
    ///
    /// Files that fail to read or parse are skipped with a warning. Files
    /// are visited in path order, which makes the duplicate-id tie-break
    /// (first wins) deterministic.
    ///
    /// # Errors
    /// [`DatabaseError::ReadDir`] if the directory itself is unreadable.
    pub fn load(dir: &Path) -> Result<Self, DatabaseError> {
        let entries = std::fs::read_dir(dir).map_err(|source| DatabaseError::ReadDir {
            dir: dir.into(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "tablet"))
            .collect();
        paths.sort();

        let mut db = Self::new();
        for path in paths {
            match read_definition(&path) {
                Ok(descriptor) => db.insert(Arc::new(descriptor)),
                Err(e) => log::warn!("skipping definition `{}`: {e}", path.display()),
            }
        }
        Ok(db)
    }

    /// Register a descriptor under each of its USB ids. An id already taken
    /// by an earlier descriptor stays with that descriptor.
    pub fn insert(&mut self, descriptor: Arc<Descriptor>) {
        for &usb in &descriptor.usb {
            match self.by_usb.entry(usb) {
                Entry::Vacant(slot) => {
                    slot.insert(descriptor.clone());
                }
                Entry::Occupied(slot) => {
                    log::warn!(
                        "duplicate definition for {usb}: keeping `{}`, ignoring `{}`",
                        slot.get().name,
                        descriptor.name
                    );
                }
            }
        }
    }

    /// Number of distinct USB ids indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_usb.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_usb.is_empty()
    }

    /// Look up a model by USB id.
    #[must_use]
    pub fn lookup_usb(&self, id: UsbId) -> Option<Arc<Descriptor>> {
        self.by_usb.get(&id).cloned()
    }
}

impl DescriptorSource for TabletDatabase {
    /// Resolve a device file such as `/dev/input/event7` to its USB id
    /// through sysfs, then consult the index.
    fn lookup(&self, device_file: &Path) -> Option<Arc<Descriptor>> {
        let id = usb_id_for_node(Path::new("/sys/class/input"), device_file)?;
        self.lookup_usb(id)
    }
}

/// Read a device node's USB id out of sysfs:
/// `<sysfs>/<node name>/device/id/{vendor,product}`, hex text.
fn usb_id_for_node(sysfs: &Path, device_file: &Path) -> Option<UsbId> {
    let name = device_file.file_name()?;
    let id_dir = sysfs.join(name).join("device").join("id");
    let read_hex = |file: &str| {
        let text = std::fs::read_to_string(id_dir.join(file)).ok()?;
        u16::from_str_radix(text.trim(), 16).ok()
    };
    Some(UsbId {
        vid: read_hex("vendor")?,
        pid: read_hex("product")?,
    })
}

/// The process-wide database, loaded once on first use from
/// [`DATA_DIR_ENV`] (falling back to [`DATA_DIR`]) and read-only after.
///
/// A failed load logs an error and yields an empty database, so lookups
/// degrade to "unknown hardware" rather than aborting the process.
#[must_use]
pub fn database() -> &'static TabletDatabase {
    static DATABASE: Lazy<TabletDatabase> = Lazy::new(|| {
        let dir = std::env::var_os(DATA_DIR_ENV)
            .map_or_else(|| PathBuf::from(DATA_DIR), PathBuf::from);
        match TabletDatabase::load(&dir) {
            Ok(db) => db,
            Err(e) => {
                log::error!("tablet database unavailable: {e}");
                TabletDatabase::new()
            }
        }
    });
    &DATABASE
}

/// On-disk shape of a `*.tablet` definition.
#[derive(Deserialize)]
struct DefinitionDto {
    name: String,
    #[serde(default)]
    usb: Vec<String>,
    #[serde(default)]
    integration: Vec<String>,
    #[serde(default)]
    reversible: bool,
    #[serde(default)]
    styli: Vec<u32>,
}

#[derive(thiserror::Error, Debug)]
enum DefinitionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Usb(#[from] UsbIdParseError),
    #[error("unknown integration `{0}` (expected `display` or `system`)")]
    UnknownIntegration(String),
}

impl TryFrom<DefinitionDto> for Descriptor {
    type Error = DefinitionError;
    fn try_from(dto: DefinitionDto) -> Result<Self, Self::Error> {
        let mut integration = IntegrationFlags::empty();
        for token in &dto.integration {
            integration |= match token.as_str() {
                "display" => IntegrationFlags::DISPLAY,
                "system" => IntegrationFlags::SYSTEM,
                other => return Err(DefinitionError::UnknownIntegration(other.into())),
            };
        }
        let usb = dto
            .usb
            .iter()
            .map(|s| s.parse::<UsbId>())
            .collect::<Result<SmallVec<[UsbId; 2]>, _>>()?;
        Ok(Self {
            name: dto.name,
            integration,
            reversible: dto.reversible,
            styli: dto.styli.into_iter().collect(),
            usb,
        })
    }
}

fn read_definition(path: &Path) -> Result<Descriptor, DefinitionError> {
    let text = std::fs::read_to_string(path)?;
    let dto: DefinitionDto = toml::from_str(&text)?;
    dto.try_into()
}
