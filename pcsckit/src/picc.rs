//! Card families
//!
//! A [`Picc`] is a typed view over a [`Unit`]. The polling loop hands every
//! freshly connected unit to [`Picc::adopt`]; a family that does not
//! recognise the card gives the unit back untouched and polling continues.
//! Several families are tried in order by implementing `Picc` for an enum
//! whose `adopt` tries each variant in turn.

use async_trait::async_trait;
use pcsckit_core::{Command, Response};

use crate::error::{ReaderError, Result};
use crate::transceive::TransceiveMode;
use crate::unit::Unit;

#[async_trait]
pub trait Picc: Sized + Send + Sync + 'static {
    /// Take ownership of `unit`, or hand it back if the card is not ours
    ///
    /// Declining must leave the connection as it was found.
    async fn adopt(unit: Unit) -> std::result::Result<Self, Unit>;

    fn unit(&self) -> &Unit;

    fn atr(&self) -> &[u8] {
        self.unit().atr()
    }

    async fn transmit(&self, bytes: &[u8], mode: TransceiveMode) -> Result<Option<Vec<u8>>> {
        self.unit().transmit(bytes, mode).await
    }

    /// Send an encoded command in raw mode and parse the answer
    ///
    /// The status word is not checked; callers inspect it themselves.
    async fn transmit_apdu(&self, command: &Command) -> Result<Response> {
        let bytes = command.encode()?;
        let response = self
            .unit()
            .transmit(&bytes, TransceiveMode::Raw)
            .await?
            .unwrap_or_default();

        Response::from_bytes(&response).map_err(ReaderError::from)
    }
}

/// Adopts any card
#[derive(Debug)]
pub struct GenericCard {
    unit: Unit,
}

impl GenericCard {
    pub fn into_unit(self) -> Unit {
        self.unit
    }
}

#[async_trait]
impl Picc for GenericCard {
    async fn adopt(unit: Unit) -> std::result::Result<Self, Unit> {
        Ok(Self { unit })
    }

    fn unit(&self) -> &Unit {
        &self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::Acr122Driver;
    use crate::driver::DriverKind;
    use crate::reader::CardReader;
    use crate::testing::{self, ATR, READER};
    use pcsckit_core::{AtrPattern, Code, StatusWord};
    use pcsckit_transport::MockTransport;
    use pcsckit_types::{CardHandle, Protocol, ReaderStateFlags};
    use pretty_assertions::assert_eq;

    /// ISO 14443 storage cards behind a PC/SC 2.01 reader
    #[derive(Debug)]
    struct Mifare {
        unit: Unit,
    }

    /// Contact cards announcing two historical bytes
    #[derive(Debug)]
    struct Contact {
        unit: Unit,
    }

    #[derive(Debug)]
    enum AnyCard {
        Mifare(Mifare),
        Contact(Contact),
    }

    fn mifare_atr() -> AtrPattern {
        AtrPattern::from_hex(
            "3B8F8001804F0CA0000003060000000000000000",
            Some("FFFFFFFFFFFFFFFFFFFFFFFF0000000000000000"),
        )
        .unwrap()
    }

    #[async_trait]
    impl Picc for Mifare {
        async fn adopt(unit: Unit) -> std::result::Result<Self, Unit> {
            if mifare_atr().matches(unit.atr()) {
                Ok(Self { unit })
            } else {
                Err(unit)
            }
        }

        fn unit(&self) -> &Unit {
            &self.unit
        }
    }

    #[async_trait]
    impl Picc for Contact {
        async fn adopt(unit: Unit) -> std::result::Result<Self, Unit> {
            if unit.atr().first() == Some(&0x3B) && unit.atr().get(1) == Some(&0x02) {
                Ok(Self { unit })
            } else {
                Err(unit)
            }
        }

        fn unit(&self) -> &Unit {
            &self.unit
        }
    }

    #[async_trait]
    impl Picc for AnyCard {
        async fn adopt(unit: Unit) -> std::result::Result<Self, Unit> {
            let unit = match Contact::adopt(unit).await {
                Ok(card) => return Ok(Self::Contact(card)),
                Err(unit) => unit,
            };
            Mifare::adopt(unit).await.map(Self::Mifare)
        }

        fn unit(&self) -> &Unit {
            match self {
                Self::Mifare(card) => card.unit(),
                Self::Contact(card) => card.unit(),
            }
        }
    }

    fn present_mock() -> MockTransport {
        let mut mock = MockTransport::new();
        testing::expect_context(&mut mock);
        testing::expect_status(&mut mock);
        mock.expect_list_readers()
            .returning(|_, _| Ok(vec![READER.into()]));
        mock.expect_get_status_change().returning(|_, _, states| {
            states[0].event_state = ReaderStateFlags::CHANGED | ReaderStateFlags::PRESENT;
            states[0].set_atr(ATR);
            Ok(())
        });
        mock.expect_connect()
            .returning(|_, _, _, _| Ok((CardHandle(9), Protocol::T1)));
        mock.expect_disconnect().returning(|_, _| Ok(()));
        mock
    }

    async fn reader(mock: MockTransport) -> CardReader {
        let session = testing::session(mock).await;
        session
            .list_readers(&[], &[DriverKind::of::<Acr122Driver>()])
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_families_tried_in_order() {
        let reader = reader(present_mock()).await;

        let card = reader
            .poll::<AnyCard>(testing::QUANTUM * 10)
            .await
            .unwrap()
            .expect("mifare card should be adopted");

        assert!(matches!(card, AnyCard::Mifare(_)));
        assert_eq!(card.atr(), ATR);
    }

    #[tokio::test]
    async fn test_transmit_apdu_keeps_failure_status() {
        let mut mock = present_mock();
        mock.expect_transmit().returning(|_, _, send, _| {
            assert_eq!(send, &[0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00, 0x00]);
            Ok((None, Some(vec![0x6A, 0x82])))
        });
        let reader = reader(mock).await;
        let card = reader
            .poll::<GenericCard>(testing::QUANTUM * 10)
            .await
            .unwrap()
            .unwrap();

        let select = Command::new(0x00, 0xA4, 0x04, 0x00)
            .with_data(vec![0x3F, 0x00])
            .with_le(256);
        let response = card.transmit_apdu(&select).await.unwrap();

        assert_eq!(response.status(), StatusWord::FILE_NOT_FOUND);
        assert!(response.data().is_empty());
    }

    #[tokio::test]
    async fn test_transmit_apdu_short_answer_is_apdu_error() {
        let mut mock = present_mock();
        mock.expect_transmit().returning(|_, _, _, _| Ok((None, Some(vec![0x90]))));
        let reader = reader(mock).await;
        let card = reader
            .poll::<GenericCard>(testing::QUANTUM * 10)
            .await
            .unwrap()
            .unwrap();

        let error = card
            .transmit_apdu(&Command::new(0xFF, 0xCA, 0x00, 0x00).with_le(0))
            .await
            .unwrap_err();
        assert!(error.is_apdu());
    }

    #[tokio::test]
    async fn test_into_unit_keeps_connection() {
        let reader = reader(present_mock()).await;
        let card = reader
            .poll::<GenericCard>(testing::QUANTUM * 10)
            .await
            .unwrap()
            .unwrap();

        let unit = card.into_unit();
        assert_eq!(unit.handle(), CardHandle(9));
        assert_eq!(unit.reader().as_str(), READER);
        assert!(unit.driver().wrap(&[0x01]).is_ok());
        unit.close().await;
    }

    #[tokio::test]
    async fn test_hardware_failure_passes_through() {
        let mut mock = present_mock();
        mock.expect_transmit()
            .returning(|_, _, _, _| Err(pcsckit_core::ScardError::new(Code::ResetCard)));
        let reader = reader(mock).await;
        let card = reader
            .poll::<GenericCard>(testing::QUANTUM * 10)
            .await
            .unwrap()
            .unwrap();

        let error = card
            .transmit(&[0x00, 0x84, 0x00, 0x00, 0x08], TransceiveMode::Raw)
            .await
            .unwrap_err();
        assert_eq!(error.code(), Some(Code::ResetCard));
    }
}
