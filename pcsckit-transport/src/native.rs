//! PC/SC Lite transport
//!
//! Wraps the `pcsc` crate. Contexts and cards are owned here and handed
//! out as integer handles so the trait stays object-safe and mockable.

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pcsckit_core::{
    Code, Pci, ScardError,
    constants::{MAX_BUFFER_SIZE_EXTENDED, MAX_CONTROL_BUFFER_SIZE},
    interpret,
};
use pcsckit_types::{
    Attribute, CardHandle, CardState, CardStatus, ContextHandle, Disposition, Initialization,
    Protocol, Protocols, ReaderGroup, ReaderName, ReaderState, ReaderStateFlags, Scope, ShareMode,
};
use tracing::{debug, trace, warn};

use crate::{Result, Transport};

struct CardEntry {
    context: u64,
    card: pcsc::Card,
}

/// Transport backed by the system resource manager
pub struct PcscTransport {
    contexts: Mutex<HashMap<u64, pcsc::Context>>,
    cards: Mutex<HashMap<u64, CardEntry>>,
    next_id: AtomicU64,
}

impl PcscTransport {
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(HashMap::new()),
            cards: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Clone of the context, so no lock is held while the library blocks
    fn context(&self, context: ContextHandle) -> Result<pcsc::Context> {
        self.contexts
            .lock()
            .get(&context.0)
            .cloned()
            .ok_or(ScardError::new(Code::InvalidHandle))
    }

    fn with_card<T>(
        &self,
        card: CardHandle,
        f: impl FnOnce(&mut pcsc::Card) -> Result<T>,
    ) -> Result<T> {
        let mut cards = self.cards.lock();
        let entry = cards
            .get_mut(&card.0)
            .ok_or(ScardError::new(Code::InvalidHandle))?;
        f(&mut entry.card)
    }
}

impl Default for PcscTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for PcscTransport {
    fn establish_context(&self, scope: Scope) -> Result<ContextHandle> {
        let context = pcsc::Context::establish(native_scope(scope)).map_err(map_error)?;
        let handle = ContextHandle(self.next_id());

        self.contexts.lock().insert(handle.0, context);
        debug!("Established {}", handle);

        Ok(handle)
    }

    fn release_context(&self, context: ContextHandle) -> Result<()> {
        let native = self
            .contexts
            .lock()
            .remove(&context.0)
            .ok_or(ScardError::new(Code::InvalidHandle))?;

        // Cards keep their context alive; dropping them disconnects with "leave"
        self.cards.lock().retain(|_, entry| entry.context != context.0);

        debug!("Releasing {}", context);
        native.release().map_err(|(_, error)| map_error(error))
    }

    fn is_valid_context(&self, context: ContextHandle) -> bool {
        self.context(context)
            .map(|native| native.is_valid().is_ok())
            .unwrap_or(false)
    }

    fn list_reader_groups(&self, context: ContextHandle) -> Result<Vec<ReaderGroup>> {
        // The library only ever reports the default group
        self.context(context)?;
        Ok(vec![ReaderGroup::Default])
    }

    fn list_readers(&self, context: ContextHandle, groups: &[ReaderGroup]) -> Result<Vec<ReaderName>> {
        let native = self.context(context)?;

        if !groups.is_empty() {
            trace!("Reader groups {:?} are not filtered by the resource manager", groups);
        }

        match native.list_readers_owned() {
            Ok(names) => Ok(names
                .into_iter()
                .map(|name| ReaderName::new(name.to_string_lossy().into_owned()))
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(error) => Err(map_error(error)),
        }
    }

    fn get_status_change(
        &self,
        context: ContextHandle,
        timeout: Option<Duration>,
        states: &mut [ReaderState],
    ) -> Result<()> {
        let native = self.context(context)?;

        let mut native_states = states
            .iter()
            .map(|state| {
                let name = CString::new(state.reader.as_str())
                    .map_err(|_| ScardError::new(Code::InvalidParameter))?;
                Ok(pcsc::ReaderState::new(
                    name,
                    pcsc::State::from_bits_truncate(state.current_state.bits() as _),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        native
            .get_status_change(timeout, &mut native_states)
            .map_err(map_error)?;

        for (state, native_state) in states.iter_mut().zip(&native_states) {
            state.event_state =
                ReaderStateFlags::from_bits_truncate(native_state.event_state().bits() as u32);
            state.set_atr(native_state.atr());
        }

        Ok(())
    }

    fn cancel(&self, context: ContextHandle) -> Result<()> {
        self.context(context)?.cancel().map_err(map_error)
    }

    fn connect(
        &self,
        context: ContextHandle,
        reader: &ReaderName,
        share_mode: ShareMode,
        preferred_protocols: Protocols,
    ) -> Result<(CardHandle, Protocol)> {
        let native = self.context(context)?;
        let name =
            CString::new(reader.as_str()).map_err(|_| ScardError::new(Code::InvalidParameter))?;

        let card = native
            .connect(&name, native_share_mode(share_mode), native_protocols(preferred_protocols))
            .map_err(map_error)?;
        let protocol = active_protocol(&card);

        let handle = CardHandle(self.next_id());
        self.cards.lock().insert(
            handle.0,
            CardEntry {
                context: context.0,
                card,
            },
        );

        debug!("Connected {} to {} using {}", handle, reader, protocol);
        Ok((handle, protocol))
    }

    fn reconnect(
        &self,
        card: CardHandle,
        share_mode: ShareMode,
        preferred_protocols: Protocols,
        initialization: Initialization,
    ) -> Result<Protocol> {
        self.with_card(card, |native| {
            native
                .reconnect(
                    native_share_mode(share_mode),
                    native_protocols(preferred_protocols),
                    native_initialization(initialization),
                )
                .map_err(map_error)?;
            Ok(active_protocol(native))
        })
    }

    fn disconnect(&self, card: CardHandle, disposition: Disposition) -> Result<()> {
        let entry = self
            .cards
            .lock()
            .remove(&card.0)
            .ok_or(ScardError::new(Code::InvalidHandle))?;
        let context = entry.context;

        match entry.card.disconnect(native_disposition(disposition)) {
            Ok(()) => {
                debug!("Disconnected {}", card);
                Ok(())
            }
            Err((native, error)) => {
                // The handle stays valid after a failed disconnect
                self.cards.lock().insert(card.0, CardEntry { context, card: native });
                Err(map_error(error))
            }
        }
    }

    fn status(&self, card: CardHandle) -> Result<CardStatus> {
        self.with_card(card, |native| {
            let status = native.status2_owned().map_err(map_error)?;

            let reader = status
                .reader_names()
                .into_iter()
                .next()
                .map(|name| ReaderName::new(name.to_string_lossy().into_owned()))
                .unwrap_or_else(|| ReaderName::new(String::new()));
            let protocol = status
                .protocol2()
                .map(from_native_protocol)
                .unwrap_or(Protocol::Undefined);

            Ok(CardStatus::new(
                reader,
                CardState::from_bits_truncate(status.status().bits() as u32),
                protocol,
                status.atr().to_vec(),
            ))
        })
    }

    fn transmit(
        &self,
        card: CardHandle,
        send_pci: Pci,
        send: &[u8],
        recv_pci: Option<Pci>,
    ) -> Result<(Option<Pci>, Option<Vec<u8>>)> {
        self.with_card(card, |native| {
            trace!("{} >> {} {}", card, send_pci, hex_prefix(send));

            let mut buffer = vec![0u8; MAX_BUFFER_SIZE_EXTENDED];
            let response = native.transmit(send, &mut buffer).map_err(map_error)?;

            trace!("{} << {}", card, hex_prefix(response));

            // The library always answers under the protocol it sent with
            let data = (!response.is_empty()).then(|| response.to_vec());
            Ok((recv_pci.map(|_| send_pci), data))
        })
    }

    fn control(&self, card: CardHandle, control_code: u32, send: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_card(card, |native| {
            let mut buffer = vec![0u8; MAX_CONTROL_BUFFER_SIZE];
            let response = native
                .control(control_code.into(), send, &mut buffer)
                .map_err(map_error)?;
            Ok((!response.is_empty()).then(|| response.to_vec()))
        })
    }

    fn begin_transaction(&self, card: CardHandle) -> Result<()> {
        self.with_card(card, |_| {
            warn!("{}: transactions spanning calls are not available through this binding", card);
            Err(ScardError::new(Code::UnsupportedFeature))
        })
    }

    fn end_transaction(&self, card: CardHandle, _disposition: Disposition) -> Result<()> {
        self.with_card(card, |_| Err(ScardError::new(Code::NotTransacted)))
    }

    fn get_attrib(&self, card: CardHandle, attribute: Attribute) -> Result<Vec<u8>> {
        self.with_card(card, |native| {
            native
                .get_attribute_owned(native_attribute(attribute))
                .map_err(map_error)
        })
    }

    fn set_attrib(&self, card: CardHandle, attribute: Attribute, value: &[u8]) -> Result<()> {
        self.with_card(card, |native| {
            native
                .set_attribute(native_attribute(attribute), value)
                .map_err(map_error)
        })
    }
}

fn map_error(error: pcsc::Error) -> ScardError {
    interpret(error as u32).unwrap_or(ScardError::new(Code::UnknownError))
}

fn hex_prefix(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(16)];
    if bytes.len() > shown.len() {
        format!("{:02X?}.. ({} bytes)", shown, bytes.len())
    } else {
        format!("{:02X?}", shown)
    }
}

fn active_protocol(card: &pcsc::Card) -> Protocol {
    card.status2_owned()
        .ok()
        .and_then(|status| status.protocol2())
        .map(from_native_protocol)
        .unwrap_or(Protocol::Undefined)
}

fn from_native_protocol(protocol: pcsc::Protocol) -> Protocol {
    match protocol {
        pcsc::Protocol::T0 => Protocol::T0,
        pcsc::Protocol::T1 => Protocol::T1,
        pcsc::Protocol::RAW => Protocol::Raw,
    }
}

fn native_protocols(protocols: Protocols) -> pcsc::Protocols {
    pcsc::Protocols::from_bits_truncate(protocols.bits() as _)
}

fn native_scope(scope: Scope) -> pcsc::Scope {
    match scope {
        Scope::User => pcsc::Scope::User,
        Scope::Terminal => pcsc::Scope::Terminal,
        Scope::System => pcsc::Scope::System,
    }
}

fn native_share_mode(share_mode: ShareMode) -> pcsc::ShareMode {
    match share_mode {
        ShareMode::Exclusive => pcsc::ShareMode::Exclusive,
        ShareMode::Shared => pcsc::ShareMode::Shared,
        ShareMode::Direct => pcsc::ShareMode::Direct,
    }
}

fn native_disposition(disposition: Disposition) -> pcsc::Disposition {
    match disposition {
        Disposition::Leave => pcsc::Disposition::LeaveCard,
        Disposition::Reset => pcsc::Disposition::ResetCard,
        Disposition::Unpower => pcsc::Disposition::UnpowerCard,
        Disposition::Eject => pcsc::Disposition::EjectCard,
    }
}

fn native_initialization(initialization: Initialization) -> pcsc::Disposition {
    match initialization {
        Initialization::Leave => pcsc::Disposition::LeaveCard,
        Initialization::Reset => pcsc::Disposition::ResetCard,
        Initialization::Unpower => pcsc::Disposition::UnpowerCard,
    }
}

fn native_attribute(attribute: Attribute) -> pcsc::Attribute {
    match attribute {
        Attribute::VendorName => pcsc::Attribute::VendorName,
        Attribute::VendorIfdType => pcsc::Attribute::VendorIfdType,
        Attribute::VendorIfdVersion => pcsc::Attribute::VendorIfdVersion,
        Attribute::VendorIfdSerialNo => pcsc::Attribute::VendorIfdSerialNo,
        Attribute::ChannelId => pcsc::Attribute::ChannelId,
        Attribute::CurrentProtocolType => pcsc::Attribute::CurrentProtocolType,
        Attribute::AtrString => pcsc::Attribute::AtrString,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_handles_are_invalid() {
        let transport = PcscTransport::new();

        let err = transport.status(CardHandle(42)).unwrap_err();
        assert_eq!(err.code(), Code::InvalidHandle);

        let err = transport.release_context(ContextHandle(7)).unwrap_err();
        assert_eq!(err.code(), Code::InvalidHandle);

        assert!(!transport.is_valid_context(ContextHandle(7)));
    }

    #[test]
    fn test_error_mapping_keeps_code() {
        assert_eq!(map_error(pcsc::Error::Timeout).code(), Code::Timeout);
        assert_eq!(map_error(pcsc::Error::NoSmartcard).code(), Code::NoSmartcard);
        assert_eq!(map_error(pcsc::Error::RemovedCard).code(), Code::RemovedCard);
    }

    #[test]
    fn test_protocol_bits_line_up() {
        assert_eq!(native_protocols(Protocols::T1), pcsc::Protocols::T1);
        assert_eq!(native_protocols(Protocols::ANY), pcsc::Protocols::T0 | pcsc::Protocols::T1);
    }

    #[test]
    fn test_hex_prefix() {
        assert_eq!(hex_prefix(&[0x90, 0x00]), "[90, 00]");
        assert!(hex_prefix(&[0u8; 20]).ends_with("(20 bytes)"));
    }
}
