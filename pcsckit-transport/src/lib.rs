//! Transport layer for PC/SC
//!
//! The [`Transport`] trait is the blocking surface of a resource manager
//! binding. [`PcscTransport`] implements it over the system's PC/SC Lite
//! (or Winscard) library, and [`SerialExecutor`] funnels every call through
//! one dedicated worker thread so the binding is never entered concurrently.

pub mod error;
pub mod executor;
pub mod native;

pub use error::Result;
pub use executor::SerialExecutor;
pub use native::PcscTransport;

use std::time::Duration;

use pcsckit_core::Pci;
use pcsckit_types::{
    Attribute, CardHandle, CardStatus, ContextHandle, Disposition, Initialization, Protocol,
    Protocols, ReaderGroup, ReaderName, ReaderState, ShareMode, Scope,
};

/// Blocking resource manager binding
///
/// Every method returns the failing result code as a
/// [`pcsckit_core::ScardError`]. Implementations need not be reentrant:
/// callers go through [`SerialExecutor`], except for [`Transport::cancel`],
/// which must be safe to call while another call is blocked.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait Transport: Send + Sync {
    fn establish_context(&self, scope: Scope) -> Result<ContextHandle>;

    fn release_context(&self, context: ContextHandle) -> Result<()>;

    fn is_valid_context(&self, context: ContextHandle) -> bool;

    fn list_reader_groups(&self, context: ContextHandle) -> Result<Vec<ReaderGroup>>;

    /// Readers in `groups`; an empty slice means every group
    fn list_readers(&self, context: ContextHandle, groups: &[ReaderGroup])
    -> Result<Vec<ReaderName>>;

    /// Block until one of `states` differs from its `current_state` or
    /// `timeout` elapses; `None` waits forever
    ///
    /// On return every entry carries the resource manager's `event_state`
    /// and ATR.
    fn get_status_change(
        &self,
        context: ContextHandle,
        timeout: Option<Duration>,
        states: &mut [ReaderState],
    ) -> Result<()>;

    /// Abort an outstanding `get_status_change` on `context`
    fn cancel(&self, context: ContextHandle) -> Result<()>;

    fn connect(
        &self,
        context: ContextHandle,
        reader: &ReaderName,
        share_mode: ShareMode,
        preferred_protocols: Protocols,
    ) -> Result<(CardHandle, Protocol)>;

    fn reconnect(
        &self,
        card: CardHandle,
        share_mode: ShareMode,
        preferred_protocols: Protocols,
        initialization: Initialization,
    ) -> Result<Protocol>;

    fn disconnect(&self, card: CardHandle, disposition: Disposition) -> Result<()>;

    fn status(&self, card: CardHandle) -> Result<CardStatus>;

    /// Exchange one APDU; the returned bytes are `None` for an empty response
    fn transmit(
        &self,
        card: CardHandle,
        send_pci: Pci,
        send: &[u8],
        recv_pci: Option<Pci>,
    ) -> Result<(Option<Pci>, Option<Vec<u8>>)>;

    fn control(&self, card: CardHandle, control_code: u32, send: &[u8]) -> Result<Option<Vec<u8>>>;

    fn begin_transaction(&self, card: CardHandle) -> Result<()>;

    fn end_transaction(&self, card: CardHandle, disposition: Disposition) -> Result<()>;

    fn get_attrib(&self, card: CardHandle, attribute: Attribute) -> Result<Vec<u8>>;

    fn set_attrib(&self, card: CardHandle, attribute: Attribute, value: &[u8]) -> Result<()>;
}
