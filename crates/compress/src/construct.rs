use crate::Encoding;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl Encoding {
    /// Short name, as used in logs.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Identity => "identity",
            Encoding::Gzip => "gzip",
        }
    }

    /// Value for the `Content-Encoding` header. Identity sends no header.
    #[inline]
    #[must_use]
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Encoding::Identity => None,
            Encoding::Gzip => Some("gzip"),
        }
    }
}
