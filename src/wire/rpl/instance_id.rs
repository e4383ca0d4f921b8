use core::fmt;

/// An RPL instance identifier ([RFC 6550 § 5.1]).
///
/// The most significant bit tells global instances (shared by a whole
/// network) apart from local ones (scoped to a single DODAG root).
///
/// [RFC 6550 § 5.1]: https://datatracker.ietf.org/doc/html/rfc6550#section-5.1
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum InstanceId {
    Global(u8),
    Local(u8),
}

impl From<u8> for InstanceId {
    fn from(val: u8) -> Self {
        const MASK: u8 = 0b0111_1111;

        if (val >> 7) & 0b1 == 0b0 {
            Self::Global(val & MASK)
        } else {
            Self::Local(val & MASK)
        }
    }
}

impl From<InstanceId> for u8 {
    fn from(val: InstanceId) -> Self {
        match val {
            InstanceId::Global(val) => val,
            InstanceId::Local(val) => 0b1000_0000 | val,
        }
    }
}

impl InstanceId {
    /// Return the real part of the ID.
    pub fn id(&self) -> u8 {
        match self {
            Self::Global(val) => *val,
            Self::Local(val) => *val,
        }
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self, InstanceId::Local(_))
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        matches!(self, InstanceId::Global(_))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_and_local() {
        assert_eq!(InstanceId::from(30), InstanceId::Global(30));
        assert_eq!(InstanceId::from(0x81), InstanceId::Local(1));
        assert_eq!(u8::from(InstanceId::Local(1)), 0x81);
        assert_eq!(InstanceId::from(0x81).to_string(), "129");
        assert!(InstanceId::from(1).is_global());
    }
}
