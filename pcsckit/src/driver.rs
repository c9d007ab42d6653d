//! Peripheral drivers
//!
//! A driver adapts "direct" transmits to what a particular reader model
//! expects, typically by wrapping payloads in a vendor pseudo-APDU. The
//! driver for a reader is chosen once, by matching its declared search
//! names against the reader's name.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use pcsckit_core::Response;
use pcsckit_types::ReaderName;

use crate::error::DriverError;
use crate::unit::Unit;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Per-connection driver instance
///
/// A fresh instance is constructed for every [`Unit`].
pub trait PeripheralDriver: Send + Sync + fmt::Debug {
    /// Encode an outgoing direct transmit; identity by default
    fn wrap(&self, bytes: &[u8]) -> DriverResult<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    /// Decode an incoming direct transmit
    ///
    /// By default the bytes are parsed as a response APDU, the status word
    /// must report success, and the body is returned.
    fn unwrap(&self, bytes: &[u8]) -> DriverResult<Vec<u8>> {
        unwrap_response(bytes)
    }

    /// Called once a polled card has been adopted
    fn did_connect(&self, _unit: &Unit) {}

    /// Called when the unit is torn down
    fn did_disconnect(&self) {}
}

/// Default response handling shared by every driver
pub fn unwrap_response(bytes: &[u8]) -> DriverResult<Vec<u8>> {
    let response = Response::from_bytes(bytes)?;
    Ok(response.into_data()?.to_vec())
}

/// A driver type that can be selected for a reader
pub trait DriverType: PeripheralDriver + Default + 'static {
    /// Case-insensitive substrings of the reader names this driver serves
    const SEARCH_NAMES: &'static [&'static str];
}

/// Type-erased handle to a [`DriverType`]
///
/// Two kinds are equal when they name the same driver type.
#[derive(Clone, Copy)]
pub struct DriverKind {
    type_id: TypeId,
    name: &'static str,
    search_names: &'static [&'static str],
    construct: fn() -> Box<dyn PeripheralDriver>,
}

impl DriverKind {
    pub fn of<D: DriverType>() -> Self {
        Self {
            type_id: TypeId::of::<D>(),
            name: type_name::<D>(),
            search_names: D::SEARCH_NAMES,
            construct: construct::<D>,
        }
    }

    /// The fallback driver: identity wrap, default unwrap
    pub fn passthrough() -> Self {
        Self::of::<PassthroughDriver>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn search_names(&self) -> &'static [&'static str] {
        self.search_names
    }

    pub fn is_passthrough(&self) -> bool {
        self.type_id == TypeId::of::<PassthroughDriver>()
    }

    /// Whether any search name occurs in `reader`, ignoring case
    ///
    /// Empty search names never match.
    pub fn matches(&self, reader: &ReaderName) -> bool {
        let reader = reader.as_str().to_lowercase();
        self.search_names
            .iter()
            .filter(|name| !name.is_empty())
            .any(|name| reader.contains(&name.to_lowercase()))
    }

    /// First candidate matching `reader`, or the passthrough driver
    pub fn resolve(reader: &ReaderName, candidates: &[DriverKind]) -> Self {
        candidates
            .iter()
            .find(|kind| kind.matches(reader))
            .copied()
            .unwrap_or_else(Self::passthrough)
    }

    /// Construct a fresh driver instance
    pub fn instantiate(&self) -> Box<dyn PeripheralDriver> {
        (self.construct)()
    }
}

fn construct<D: DriverType>() -> Box<dyn PeripheralDriver> {
    Box::new(D::default())
}

impl PartialEq for DriverKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DriverKind {}

impl Hash for DriverKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverKind")
            .field("name", &self.name)
            .field("search_names", &self.search_names)
            .finish()
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.rsplit("::").next().unwrap_or(self.name))
    }
}

/// Driver used when no candidate matches a reader
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughDriver;

impl PeripheralDriver for PassthroughDriver {}

impl DriverType for PassthroughDriver {
    const SEARCH_NAMES: &'static [&'static str] = &[];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use pcsckit_core::StatusWord;

    #[derive(Debug, Default)]
    struct OmniKeyDriver;
    impl PeripheralDriver for OmniKeyDriver {}
    impl DriverType for OmniKeyDriver {
        const SEARCH_NAMES: &'static [&'static str] = &["OMNIKEY", "HID Global"];
    }

    #[derive(Debug, Default)]
    struct AnyUsbDriver;
    impl PeripheralDriver for AnyUsbDriver {}
    impl DriverType for AnyUsbDriver {
        const SEARCH_NAMES: &'static [&'static str] = &["usb"];
    }

    #[derive(Debug, Default)]
    struct BlankDriver;
    impl PeripheralDriver for BlankDriver {}
    impl DriverType for BlankDriver {
        const SEARCH_NAMES: &'static [&'static str] = &[""];
    }

    fn reader(name: &str) -> ReaderName {
        ReaderName::from(name)
    }

    #[test]
    fn test_match_ignores_case() {
        let kind = DriverKind::of::<OmniKeyDriver>();
        assert!(kind.matches(&reader("HID Global OMNIKEY 5422 Smartcard Reader")));
        assert!(kind.matches(&reader("omnikey cardman 3121")));
        assert!(!kind.matches(&reader("ACS ACR122U")));
    }

    #[test]
    fn test_first_candidate_wins() {
        let name = reader("HID Global OMNIKEY USB Reader");
        let omnikey = DriverKind::of::<OmniKeyDriver>();
        let usb = DriverKind::of::<AnyUsbDriver>();

        assert_eq!(DriverKind::resolve(&name, &[omnikey, usb]), omnikey);
        assert_eq!(DriverKind::resolve(&name, &[usb, omnikey]), usb);
    }

    #[test]
    fn test_no_match_selects_passthrough() {
        let resolved = DriverKind::resolve(&reader("Gemalto PC Twin"), &[DriverKind::of::<OmniKeyDriver>()]);
        assert!(resolved.is_passthrough());
        assert!(DriverKind::resolve(&reader("Gemalto PC Twin"), &[]).is_passthrough());
    }

    #[test]
    fn test_empty_search_name_never_matches() {
        assert!(!DriverKind::of::<BlankDriver>().matches(&reader("Any Reader")));
    }

    #[test]
    fn test_kind_equality_is_by_type() {
        assert_eq!(DriverKind::of::<OmniKeyDriver>(), DriverKind::of::<OmniKeyDriver>());
        assert_ne!(DriverKind::of::<OmniKeyDriver>(), DriverKind::passthrough());
        assert_eq!(DriverKind::passthrough().to_string(), "PassthroughDriver");
    }

    #[test]
    fn test_default_wrap_is_identity() {
        let driver = DriverKind::passthrough().instantiate();
        assert_eq!(driver.wrap(&[0x00, 0xB0, 0x00, 0x00]).unwrap(), vec![0x00, 0xB0, 0x00, 0x00]);
    }

    #[test]
    fn test_default_unwrap_strips_status() {
        let driver = PassthroughDriver;
        assert_eq!(driver.unwrap(&[0x01, 0x02, 0x90, 0x00]).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_default_unwrap_rejects_failure_status() {
        let error = ReaderError::from_driver(PassthroughDriver.unwrap(&[0x69, 0x82]).unwrap_err());
        match error {
            ReaderError::Apdu(apdu) => {
                assert_eq!(apdu.status(), Some(StatusWord::SECURITY_STATUS_NOT_SATISFIED));
            }
            other => panic!("expected APDU error, got {other:?}"),
        }
    }
}
