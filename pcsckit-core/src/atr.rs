//! ATR pattern matching

use std::fmt;

use crate::error::{Error, Result};

/// Prefix pattern over an Answer To Reset, with an optional bit mask
///
/// A pattern matches any ATR at least as long as itself whose leading
/// bytes agree with the pattern on every masked bit.
///
/// # Examples
///
/// ```
/// use pcsckit_core::AtrPattern;
///
/// // PC/SC part 3 storage card, any card name
/// let pattern = AtrPattern::from_hex("3B8F8001804F0CA0000003060300", None).unwrap();
/// let atr = hex::decode("3B8F8001804F0CA000000306030001000000006A").unwrap();
/// assert!(pattern.matches(&atr));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AtrPattern {
    pattern: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl AtrPattern {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self {
            pattern: pattern.into(),
            mask: None,
        }
    }

    /// Masked pattern; the mask must cover every pattern byte
    pub fn with_mask(pattern: impl Into<Vec<u8>>, mask: impl Into<Vec<u8>>) -> Result<Self> {
        let pattern = pattern.into();
        let mask = mask.into();

        if mask.len() != pattern.len() {
            return Err(Error::InvalidAtrPattern(format!(
                "mask length {} does not match pattern length {}",
                mask.len(),
                pattern.len()
            )));
        }

        Ok(Self {
            pattern,
            mask: Some(mask),
        })
    }

    pub fn from_hex(pattern: &str, mask: Option<&str>) -> Result<Self> {
        let decode = |s: &str| {
            hex::decode(s).map_err(|e| Error::InvalidAtrPattern(format!("{s:?}: {e}")))
        };

        match mask {
            Some(mask) => Self::with_mask(decode(pattern)?, decode(mask)?),
            None => Ok(Self::new(decode(pattern)?)),
        }
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_deref()
    }

    pub fn matches(&self, atr: &[u8]) -> bool {
        if self.pattern.len() > atr.len() {
            return false;
        }

        match &self.mask {
            Some(mask) => self
                .pattern
                .iter()
                .zip(mask)
                .zip(atr)
                .all(|((p, m), a)| (a & m) == (p & m)),
            None => atr.starts_with(&self.pattern),
        }
    }
}

impl fmt::Debug for AtrPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AtrPattern");
        s.field("pattern", &hex::encode_upper(&self.pattern));
        if let Some(mask) = &self.mask {
            s.field("mask", &hex::encode_upper(mask));
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmasked_prefix() {
        let pattern = AtrPattern::new(vec![0x3B, 0x8F, 0x80]);
        assert!(pattern.matches(&[0x3B, 0x8F, 0x80]));
        assert!(pattern.matches(&[0x3B, 0x8F, 0x80, 0x01]));
        assert!(!pattern.matches(&[0x3B, 0x8F]));
        assert!(!pattern.matches(&[0x3B, 0x8E, 0x80]));
    }

    #[test]
    fn test_masked_match() {
        let pattern = AtrPattern::with_mask(vec![0x3B, 0x80], vec![0xFF, 0xF0]).unwrap();
        assert!(pattern.matches(&[0x3B, 0x8F]));
        assert!(pattern.matches(&[0x3B, 0x81, 0x00]));
        assert!(!pattern.matches(&[0x3B, 0x7F]));
    }

    #[test]
    fn test_mask_length_mismatch() {
        assert!(matches!(
            AtrPattern::with_mask(vec![0x3B, 0x80], vec![0xFF]),
            Err(Error::InvalidAtrPattern(_))
        ));
    }

    #[test]
    fn test_from_hex() {
        let pattern = AtrPattern::from_hex("3b8f", Some("ffff")).unwrap();
        assert_eq!(pattern.pattern(), &[0x3B, 0x8F]);
        assert_eq!(pattern.mask(), Some(&[0xFF, 0xFF][..]));
        assert!(AtrPattern::from_hex("3g", None).is_err());
    }
}
