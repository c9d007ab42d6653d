//! ISO 7816-4 response APDU parsing

use bytes::Bytes;
use std::fmt;

use crate::{
    error::{Error, Result},
    status::StatusWord,
};

/// Response APDU: body followed by SW1 SW2
///
/// # Examples
///
/// ```
/// use pcsckit_core::{Response, StatusWord};
///
/// let response = Response::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
/// assert_eq!(response.data(), &[0x01, 0x02]);
/// assert_eq!(response.status(), StatusWord::SUCCESS);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    status: StatusWord,
}

impl Response {
    pub fn new(data: impl Into<Bytes>, status: StatusWord) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Split raw bytes into body and status word
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::ResponseTooShort {
                actual: bytes.len(),
            });
        }

        let (data, sw) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn status(&self) -> StatusWord {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fail unless the status word reports normal processing
    pub fn check(&self) -> Result<()> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(Error::Status {
                status: self.status,
            })
        }
    }

    /// Body of a successful response
    pub fn into_data(self) -> Result<Bytes> {
        self.check()?;
        Ok(self.data)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("data", &hex::encode_upper(&self.data))
            .field("status", &format_args!("{}", self.status))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only() {
        let response = Response::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(response.data().is_empty());
        assert_eq!(response.status(), StatusWord::FILE_NOT_FOUND);
        assert_eq!(
            response.check(),
            Err(Error::Status {
                status: StatusWord::FILE_NOT_FOUND
            })
        );
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            Response::from_bytes(&[0x90]),
            Err(Error::ResponseTooShort { actual: 1 })
        );
        assert_eq!(
            Response::from_bytes(&[]),
            Err(Error::ResponseTooShort { actual: 0 })
        );
    }

    #[test]
    fn test_into_data() {
        let response = Response::from_bytes(&[0xDE, 0xAD, 0x61, 0x04]).unwrap();
        assert_eq!(response.into_data().unwrap().as_ref(), &[0xDE, 0xAD]);
    }
}
