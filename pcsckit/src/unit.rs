//! Live card connections

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pcsckit_core::Pci;
use pcsckit_transport::SerialExecutor;
use pcsckit_types::{
    Attribute, CardHandle, CardState, CardStatus, ContextHandle, Disposition, Initialization,
    Protocol, Protocols, ReaderName, ShareMode,
};
use tracing::{debug, trace, warn};

use crate::driver::PeripheralDriver;
use crate::error::{ReaderError, Result};
use crate::transceive::TransceiveMode;

/// How a unit connects to its reader
#[derive(Debug, Clone, Copy)]
pub(crate) struct Connection {
    pub context: ContextHandle,
    pub share_mode: ShareMode,
    pub preferred_protocols: Protocols,
}

/// A connected handle not yet owned by a [`Unit`]
///
/// Dropping the guard disconnects the handle with [`Disposition::Leave`].
/// This covers a connect whose caller stopped waiting, whether the guard
/// is dropped on the worker or inside the result channel.
struct HandleGuard {
    executor: Arc<SerialExecutor>,
    handle: CardHandle,
    armed: bool,
}

impl HandleGuard {
    fn new(executor: Arc<SerialExecutor>, handle: CardHandle) -> Self {
        Self {
            executor,
            handle,
            armed: true,
        }
    }

    fn release(mut self) -> CardHandle {
        self.armed = false;
        self.handle
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let handle = self.handle;
        debug!("Discarding unclaimed {}", handle);
        self.executor.detached(move |t| {
            if let Err(e) = t.disconnect(handle, Disposition::Leave) {
                warn!("Failed to disconnect {}: {}", handle, e);
            }
        });
    }
}

/// One connection to a card
///
/// The ATR is captured when the unit is opened and never changes. The
/// card is disconnected with [`Disposition::Leave`] by [`Unit::close`], or
/// in the background when the unit is dropped; neither reports failure.
pub struct Unit {
    executor: Arc<SerialExecutor>,
    reader: ReaderName,
    handle: CardHandle,
    protocol: Protocol,
    pci: Pci,
    state: CardState,
    atr: Vec<u8>,
    share_mode: ShareMode,
    preferred_protocols: Protocols,
    driver: Box<dyn PeripheralDriver>,
    announced: AtomicBool,
    closed: bool,
}

impl Unit {
    /// Connect to the card in `reader` and capture its status
    ///
    /// Connect and status run as one job. The handle is disconnected again
    /// if anything fails, or if the returned future is dropped early.
    pub(crate) async fn connect(
        executor: Arc<SerialExecutor>,
        reader: ReaderName,
        connection: Connection,
        driver: Box<dyn PeripheralDriver>,
    ) -> Result<Self> {
        let Connection {
            context,
            share_mode,
            preferred_protocols,
        } = connection;

        let job_executor = Arc::clone(&executor);
        let name = reader.clone();
        let (guard, protocol, status) = executor
            .run(move |t| {
                let (handle, protocol) = t.connect(context, &name, share_mode, preferred_protocols)?;
                let guard = HandleGuard::new(job_executor, handle);
                let status = t.status(handle)?;
                Ok((guard, protocol, status))
            })
            .await?;

        let pci = Pci::for_protocol(protocol)?;
        let handle = guard.release();

        trace!("Opened {} on {}: {}", handle, reader, status);

        Ok(Self {
            executor,
            reader,
            handle,
            protocol,
            pci,
            state: status.state,
            atr: status.atr,
            share_mode,
            preferred_protocols,
            driver,
            announced: AtomicBool::new(false),
            closed: false,
        })
    }

    pub fn reader(&self) -> &ReaderName {
        &self.reader
    }

    pub fn handle(&self) -> CardHandle {
        self.handle
    }

    /// Protocol negotiated at connect (or last reconnect)
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Card state observed when the unit was opened
    pub fn state(&self) -> CardState {
        self.state
    }

    /// Answer To Reset observed when the unit was opened
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    pub fn driver(&self) -> &dyn PeripheralDriver {
        self.driver.as_ref()
    }

    /// Tell the driver the unit was adopted; later calls do nothing
    pub(crate) fn announce(&self) {
        if !self.announced.swap(true, Ordering::SeqCst) {
            self.driver.did_connect(self);
        }
    }

    fn retire(&self) {
        if self.announced.load(Ordering::SeqCst) {
            self.driver.did_disconnect();
        }
    }

    /// Send bytes to the card
    ///
    /// In [`TransceiveMode::Raw`] the response is returned untouched, `None`
    /// when the card sent nothing. In [`TransceiveMode::Direct`] the bytes
    /// pass through the driver's `wrap` and `unwrap` hooks.
    pub async fn transmit(&self, bytes: &[u8], mode: TransceiveMode) -> Result<Option<Vec<u8>>> {
        let send = match mode {
            TransceiveMode::Raw => bytes.to_vec(),
            TransceiveMode::Direct => self.driver.wrap(bytes).map_err(ReaderError::from_driver)?,
        };

        trace!("{} >> [{}]", self.handle, hex::encode_upper(&send));

        let handle = self.handle;
        let pci = self.pci;
        let (_, response) = self
            .executor
            .run(move |t| t.transmit(handle, pci, &send, None))
            .await?;

        trace!(
            "{} << [{}]",
            self.handle,
            response.as_deref().map(hex::encode_upper).unwrap_or_default()
        );

        match mode {
            TransceiveMode::Raw => Ok(response),
            TransceiveMode::Direct => self
                .driver
                .unwrap(response.as_deref().unwrap_or_default())
                .map(Some)
                .map_err(ReaderError::from_driver),
        }
    }

    /// Current status of the card
    pub async fn status(&self) -> Result<CardStatus> {
        let handle = self.handle;
        Ok(self.executor.run(move |t| t.status(handle)).await?)
    }

    /// Re-establish the connection, keeping the original share mode and protocols
    ///
    /// Returns the renegotiated protocol.
    pub async fn reconnect(&mut self, initialization: Initialization) -> Result<Protocol> {
        let handle = self.handle;
        let share_mode = self.share_mode;
        let preferred = self.preferred_protocols;

        let protocol = self
            .executor
            .run(move |t| t.reconnect(handle, share_mode, preferred, initialization))
            .await?;

        self.pci = Pci::for_protocol(protocol)?;
        self.protocol = protocol;

        debug!("Reconnected {} using {}", self.handle, protocol);
        Ok(protocol)
    }

    /// Send a control code straight to the reader driver
    pub async fn control(&self, control_code: u32, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
        let handle = self.handle;
        let send = bytes.to_vec();
        Ok(self
            .executor
            .run(move |t| t.control(handle, control_code, &send))
            .await?)
    }

    pub async fn begin_transaction(&self) -> Result<()> {
        let handle = self.handle;
        Ok(self.executor.run(move |t| t.begin_transaction(handle)).await?)
    }

    pub async fn end_transaction(&self, disposition: Disposition) -> Result<()> {
        let handle = self.handle;
        Ok(self
            .executor
            .run(move |t| t.end_transaction(handle, disposition))
            .await?)
    }

    pub async fn attribute(&self, attribute: Attribute) -> Result<Vec<u8>> {
        let handle = self.handle;
        Ok(self.executor.run(move |t| t.get_attrib(handle, attribute)).await?)
    }

    pub async fn set_attribute(&self, attribute: Attribute, value: &[u8]) -> Result<()> {
        let handle = self.handle;
        let value = value.to_vec();
        Ok(self
            .executor
            .run(move |t| t.set_attrib(handle, attribute, &value))
            .await?)
    }

    /// Disconnect and wait for it; failures are logged only
    pub async fn close(mut self) {
        self.closed = true;
        self.retire();

        let handle = self.handle;
        match self
            .executor
            .run(move |t| t.disconnect(handle, Disposition::Leave))
            .await
        {
            Ok(()) => debug!("Disconnected {}", handle),
            Err(e) => warn!("Failed to disconnect {}: {}", handle, e),
        }
    }
}

impl Drop for Unit {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        self.retire();

        let handle = self.handle;
        self.executor.detached(move |t| match t.disconnect(handle, Disposition::Leave) {
            Ok(()) => trace!("Disconnected {} on drop", handle),
            Err(e) => warn!("Failed to disconnect {}: {}", handle, e),
        });
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("reader", &self.reader)
            .field("handle", &self.handle)
            .field("protocol", &self.protocol)
            .field("atr", &hex::encode_upper(&self.atr))
            .field("driver", &self.driver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverKind, PassthroughDriver};
    use crate::drivers::Acr122Driver;
    use crate::testing::{self, ATR};
    use pcsckit_core::{Code, ScardError, StatusWord};
    use pcsckit_transport::MockTransport;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connection() -> Connection {
        Connection {
            context: ContextHandle(1),
            share_mode: ShareMode::Shared,
            preferred_protocols: Protocols::T0 | Protocols::T1,
        }
    }

    async fn open_with(
        mut mock: MockTransport,
        protocol: Protocol,
        driver: Box<dyn PeripheralDriver>,
    ) -> Result<Unit> {
        mock.expect_connect()
            .returning(move |context, reader, _, _| {
                assert_eq!(context, ContextHandle(1));
                assert_eq!(reader.as_str(), testing::READER);
                Ok((CardHandle(7), protocol))
            });

        let executor = Arc::new(SerialExecutor::new(Arc::new(mock)).unwrap());
        Unit::connect(executor, ReaderName::from(testing::READER), connection(), driver).await
    }

    async fn open(mock: MockTransport, protocol: Protocol) -> Result<Unit> {
        open_with(mock, protocol, Box::new(PassthroughDriver)).await
    }

    fn card_mock() -> MockTransport {
        let mut mock = MockTransport::new();
        testing::expect_status(&mut mock);
        mock
    }

    #[tokio::test]
    async fn test_open_captures_atr() {
        let mut mock = card_mock();
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        assert_eq!(unit.atr(), ATR);
        assert_eq!(unit.protocol(), Protocol::T1);
        assert_eq!(unit.handle(), CardHandle(7));
        unit.close().await;
    }

    #[tokio::test]
    async fn test_open_rejects_unconnectable_protocol() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut mock = card_mock();
        let counter = Arc::clone(&disconnects);
        mock.expect_disconnect().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let error = open(mock, Protocol::Undefined).await.unwrap_err();
        assert_eq!(error.code(), Some(Code::ProtoMismatch));

        assert!(testing::eventually(|| disconnects.load(Ordering::SeqCst) == 1).await);
    }

    #[tokio::test]
    async fn test_raw_transmit_passes_bytes_through() {
        let mut mock = card_mock();
        mock.expect_transmit().returning(|_, pci, send, _| {
            assert_eq!(pci, Pci::T1);
            assert_eq!(send, &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
            Ok((None, Some(vec![0x04, 0xA2, 0x90, 0x00])))
        });
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        let response = unit
            .transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00], TransceiveMode::Raw)
            .await
            .unwrap();
        assert_eq!(response, Some(vec![0x04, 0xA2, 0x90, 0x00]));
    }

    #[tokio::test]
    async fn test_raw_transmit_empty_response_is_none() {
        let mut mock = card_mock();
        mock.expect_transmit().returning(|_, _, _, _| Ok((None, None)));
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T0).await.unwrap();
        assert_eq!(unit.transmit(&[0x00], TransceiveMode::Raw).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_direct_transmit_unwraps_payload() {
        let mut mock = card_mock();
        mock.expect_transmit()
            .returning(|_, _, _, _| Ok((None, Some(vec![0xDE, 0xAD, 0x90, 0x00]))));
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        let response = unit.transmit(&[0x00, 0xB0], TransceiveMode::Direct).await.unwrap();
        assert_eq!(response, Some(vec![0xDE, 0xAD]));
    }

    #[tokio::test]
    async fn test_direct_transmit_bad_status_is_apdu_error() {
        let mut mock = card_mock();
        mock.expect_transmit()
            .returning(|_, _, _, _| Ok((None, Some(vec![0x6A, 0x82]))));
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        let error = unit.transmit(&[0x00, 0xA4], TransceiveMode::Direct).await.unwrap_err();

        assert!(!error.is_hardware());
        match error {
            ReaderError::Apdu(apdu) => assert_eq!(apdu.status(), Some(StatusWord::FILE_NOT_FOUND)),
            other => panic!("expected APDU error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_hardware_error() {
        let mut mock = card_mock();
        mock.expect_transmit()
            .returning(|_, _, _, _| Err(ScardError::new(Code::RemovedCard)));
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        for mode in [TransceiveMode::Raw, TransceiveMode::Direct] {
            let error = unit.transmit(&[0x00], mode).await.unwrap_err();
            assert_eq!(error.code(), Some(Code::RemovedCard));
        }
    }

    #[tokio::test]
    async fn test_failing_disconnect_is_swallowed() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut mock = card_mock();
        let counter = Arc::clone(&disconnects);
        mock.expect_disconnect().returning(move |_, disposition| {
            assert_eq!(disposition, Disposition::Leave);
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ScardError::new(Code::RemovedCard))
        });

        let unit = open(mock, Protocol::T1).await.unwrap();
        unit.close().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_disconnects_once() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut mock = card_mock();
        let counter = Arc::clone(&disconnects);
        mock.expect_disconnect().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ScardError::new(Code::InvalidHandle))
        });

        let unit = open(mock, Protocol::T1).await.unwrap();
        drop(unit);

        assert!(testing::eventually(|| disconnects.load(Ordering::SeqCst) == 1).await);
    }

    #[tokio::test]
    async fn test_reconnect_updates_protocol() {
        let mut mock = card_mock();
        mock.expect_reconnect()
            .returning(|_, share_mode, _, initialization| {
                assert_eq!(share_mode, ShareMode::Shared);
                assert_eq!(initialization, Initialization::Reset);
                Ok(Protocol::T0)
            });
        mock.expect_transmit().returning(|_, pci, _, _| {
            assert_eq!(pci, Pci::T0);
            Ok((None, None))
        });
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let mut unit = open(mock, Protocol::T1).await.unwrap();
        assert_eq!(unit.reconnect(Initialization::Reset).await.unwrap(), Protocol::T0);
        assert_eq!(unit.protocol(), Protocol::T0);
        unit.transmit(&[0x00], TransceiveMode::Raw).await.unwrap();
    }

    #[tokio::test]
    async fn test_attributes_and_control() {
        let mut mock = card_mock();
        mock.expect_get_attrib()
            .returning(|_, attribute| {
                assert_eq!(attribute, Attribute::VendorName);
                Ok(b"ACS".to_vec())
            });
        mock.expect_control()
            .returning(|_, code, send| {
                assert_eq!(code, 0x42_0000 + 3500);
                Ok(Some(send.to_vec()))
            });
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open(mock, Protocol::T1).await.unwrap();
        assert_eq!(unit.attribute(Attribute::VendorName).await.unwrap(), b"ACS".to_vec());
        assert_eq!(
            unit.control(0x42_0000 + 3500, &[0x01]).await.unwrap(),
            Some(vec![0x01])
        );
    }

    #[tokio::test]
    async fn test_status_failure_disconnects() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut mock = MockTransport::new();
        mock.expect_status()
            .returning(|_| Err(ScardError::new(Code::UnpoweredCard)));
        let counter = Arc::clone(&disconnects);
        mock.expect_disconnect().returning(move |handle, _| {
            assert_eq!(handle, CardHandle(7));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let error = open(mock, Protocol::T1).await.unwrap_err();
        assert_eq!(error.code(), Some(Code::UnpoweredCard));

        assert!(testing::eventually(|| disconnects.load(Ordering::SeqCst) == 1).await);
    }

    #[tokio::test]
    async fn test_direct_transmit_through_acr122() {
        let mut mock = card_mock();
        mock.expect_transmit().returning(|_, _, send, _| {
            assert_eq!(
                send,
                &[0xFF, 0x00, 0x00, 0x00, 0x05, 0xD4, 0x40, 0x01, 0x30, 0x04]
            );
            Ok((None, Some(vec![0xD5, 0x41, 0x00, 0x04, 0xA2, 0x1B, 0x90, 0x00])))
        });
        mock.expect_disconnect().returning(|_, _| Ok(()));

        let unit = open_with(mock, Protocol::T1, Box::new(Acr122Driver)).await.unwrap();
        let response = unit
            .transmit(&[0x30, 0x04], TransceiveMode::Direct)
            .await
            .unwrap();

        assert_eq!(response, Some(vec![0x04, 0xA2, 0x1B]));
        unit.close().await;
    }

    #[test]
    fn test_passthrough_kind_builds_passthrough() {
        let driver = DriverKind::passthrough().instantiate();
        assert!(format!("{driver:?}").contains("PassthroughDriver"));
    }
}
