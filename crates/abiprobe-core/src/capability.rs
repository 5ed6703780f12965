//! 128-bit capability identifiers.
//!
//! Each interface in the model is associated with exactly one identifier and
//! capability lookup is keyed on exact equality of all 16 bytes.

use std::fmt;
use std::str::FromStr;

use crate::error::AbiError;

/// A capability identifier in the classic `{8-4-4-4-12}` layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Parse `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`, with or without braces.
    pub fn parse(text: &str) -> Result<Self, AbiError> {
        let bad = |detail: &str| AbiError::Layout {
            shape: "Guid",
            detail: format!("{detail}: {text:?}"),
        };
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(trimmed);
        let groups: Vec<&str> = body.split('-').collect();
        let widths = [8, 4, 4, 4, 12];
        if groups.len() != widths.len()
            || groups.iter().zip(widths).any(|(g, w)| g.len() != w)
        {
            return Err(bad("expected 8-4-4-4-12 hex groups"));
        }
        let hex_u64 = |s: &str| u64::from_str_radix(s, 16).map_err(|_| bad("invalid hex digit"));
        let data1 = hex_u64(groups[0])? as u32;
        let data2 = hex_u64(groups[1])? as u16;
        let data3 = hex_u64(groups[2])? as u16;
        let tail = (hex_u64(groups[3])? << 48) | hex_u64(groups[4])?;
        Ok(Self::new(data1, data2, data3, tail.to_be_bytes()))
    }
}

impl FromStr for Guid {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

const fn model_iid(last: u8) -> Guid {
    Guid::new(
        0x8A1C_0D7E,
        0x3F2B,
        0x4C6A,
        [0x9E, 0x15, 0x2D, 0x7B, 0x4F, 0x0A, 0x6C, last],
    )
}

/// Base object capability: acquire, release, capability lookup.
pub const IID_IOBJECT: Guid = Guid::new(
    0x0000_0000,
    0x0000,
    0x0000,
    [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46],
);
pub const IID_IINTERFACE: Guid = model_iid(0x31);
pub const IID_IINTERFACE2: Guid = model_iid(0x32);
pub const IID_ILARGE_INTERFACE: Guid = model_iid(0x33);
pub const IID_IINTERFACE_WITH_PROPERTIES: Guid = model_iid(0x34);
pub const IID_IFAST_OUT_INTERFACE: Guid = model_iid(0x35);
pub const IID_IPASS_THROUGH_METHOD_TEST: Guid = model_iid(0x36);
pub const IID_IELEMENT: Guid = model_iid(0x37);
pub const IID_ICALLBACK: Guid = model_iid(0x38);
/// `{16410F4E-B4AB-4B33-B9A3-7FC8FA15F4F4}`
pub const IID_IINTERFACE_WITH_GUID: Guid = Guid::new(
    0x1641_0F4E,
    0xB4AB,
    0x4B33,
    [0xB9, 0xA3, 0x7F, 0xC8, 0xFA, 0x15, 0xF4, 0xF4],
);

/// Every identifier in the model with its interface name.
pub const KNOWN_CAPABILITIES: &[(&str, Guid)] = &[
    ("IObject", IID_IOBJECT),
    ("IInterface", IID_IINTERFACE),
    ("IInterface2", IID_IINTERFACE2),
    ("IInterfaceWithGuid", IID_IINTERFACE_WITH_GUID),
    ("ILargeInterface", IID_ILARGE_INTERFACE),
    ("IInterfaceWithProperties", IID_IINTERFACE_WITH_PROPERTIES),
    ("IFastOutInterface", IID_IFAST_OUT_INTERFACE),
    ("IPassThroughMethodTest", IID_IPASS_THROUGH_METHOD_TEST),
    ("IElement", IID_IELEMENT),
    ("ICallback", IID_ICALLBACK),
];

/// Interface name for a known identifier.
#[must_use]
pub fn capability_name(iid: &Guid) -> Option<&'static str> {
    KNOWN_CAPABILITIES
        .iter()
        .find(|(_, known)| known == iid)
        .map(|(name, _)| *name)
}
