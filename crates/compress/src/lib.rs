//! Content-Encoding for objects pushed to storage.
//!
//! A published object is either sent as-is ([`Encoding::Identity`]) or
//! gzip-compressed and tagged with a `Content-Encoding: gzip` header so that
//! the CDN serves it to browsers unchanged. The [`Level`] is chosen by the
//! caller; text assets are compressed at a moderate level because they are
//! compressed on every upload, not once.

mod construct;
pub mod error;
mod ops;

/// How an object body is encoded on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Sent as-is, no `Content-Encoding` header.
    #[default]
    Identity,
    /// Gzip (RFC 1952).
    Gzip,
}

/// Gzip compression level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level(u32);
impl Level {
    pub const DEFAULT: Level = Level(6);

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }
}
impl Default for Level {
    fn default() -> Self {
        Self::DEFAULT
    }
}
