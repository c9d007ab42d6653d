//! Card readers

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use pcsckit_types::ReaderName;
use tracing::trace;

use crate::cancel::CancelToken;
use crate::driver::DriverKind;
use crate::error::Result;
use crate::picc::Picc;
use crate::poll;
use crate::session::Session;

/// A named reader slot bound to a session
///
/// The driver is resolved once, when the reader is listed. Two readers are
/// equal when their names are.
#[derive(Clone)]
pub struct CardReader {
    session: Session,
    name: ReaderName,
    driver: DriverKind,
}

impl CardReader {
    pub(crate) fn new(session: Session, name: ReaderName, drivers: &[DriverKind]) -> Self {
        let driver = DriverKind::resolve(&name, drivers);
        trace!("Reader {:?} uses {}", name.as_str(), driver);

        Self {
            session,
            name,
            driver,
        }
    }

    pub fn name(&self) -> &ReaderName {
        &self.name
    }

    pub fn driver(&self) -> DriverKind {
        self.driver
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Wait up to `timeout` for a card that `P` adopts
    ///
    /// `Ok(None)` means nothing suitable turned up in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use pcsckit::{GenericCard, Picc, Session};
    ///
    /// # async fn run() -> pcsckit::Result<()> {
    /// let session = Session::open().await?;
    /// let readers = session.list_readers(&[], &[]).await?;
    ///
    /// if let Some(reader) = readers.first() {
    ///     if let Some(card) = reader.poll::<GenericCard>(Duration::from_secs(10)).await? {
    ///         println!("ATR: {:02X?}", card.atr());
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn poll<P: Picc>(&self, timeout: Duration) -> Result<Option<P>> {
        self.poll_with(timeout, &CancelToken::new()).await
    }

    /// [`CardReader::poll`] bounded by the session's default timeout
    pub async fn poll_default<P: Picc>(&self) -> Result<Option<P>> {
        self.poll(self.session.config().default_timeout()).await
    }

    /// [`CardReader::poll`], stopping early once `cancel` is triggered
    pub async fn poll_with<P: Picc>(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<P>> {
        poll::poll_card(self, timeout, cancel).await
    }

    /// Wait up to `timeout` for the reader to become empty
    ///
    /// Returns `true` once removal was observed and `false` on timeout.
    pub async fn wait_for_removal(&self, timeout: Duration) -> Result<bool> {
        self.wait_for_removal_with(timeout, &CancelToken::new()).await
    }

    pub async fn wait_for_removal_default(&self) -> Result<bool> {
        self.wait_for_removal(self.session.config().default_timeout()).await
    }

    /// [`CardReader::wait_for_removal`], stopping early once `cancel` is triggered
    pub async fn wait_for_removal_with(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool> {
        poll::wait_for_removal(self, timeout, cancel).await
    }
}

impl PartialEq for CardReader {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CardReader {}

impl Hash for CardReader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for CardReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardReader")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .finish()
    }
}

impl fmt::Display for CardReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}
