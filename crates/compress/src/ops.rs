//! Encoding Operations

use crate::error::{ErrorKind, Result};
use crate::{Encoding, Level};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;

impl Encoding {
    /// Encode a body in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferry_compress::{Encoding, Level};
    ///
    /// let body = b"console.log('hello');".repeat(20);
    /// let encoded = Encoding::Gzip.encode(&body, Level::DEFAULT).unwrap();
    /// assert!(encoded.len() < body.len());
    /// assert_eq!(Encoding::Gzip.decode(&encoded).unwrap(), body);
    /// ```
    #[instrument(skip(input), fields(encoding = %self, input_size = input.len(), output_size))]
    pub fn encode(&self, input: &[u8], level: Level) -> Result<Vec<u8>> {
        let output = match self {
            Encoding::Identity => input.to_vec(),
            Encoding::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(input.len() / 2), GzCompression::new(level.get()));
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?
            },
        };
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Decode a body in memory.
    pub fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Encoding::Identity => Ok(input.to_vec()),
            Encoding::Gzip => {
                let mut output = Vec::new();
                GzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
                Ok(output)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_decodes_back() {
        let body = b"<html><body>hello</body></html>".repeat(10);
        let encoded = Encoding::Gzip.encode(&body, Level::DEFAULT).unwrap();
        assert!(encoded.starts_with(&[0x1F, 0x8B]));
        assert!(encoded.len() < body.len());
        assert_eq!(Encoding::Gzip.decode(&encoded).unwrap(), body);
    }

    #[test]
    fn test_identity_is_passthrough() {
        let body = b"plain";
        assert_eq!(Encoding::Identity.encode(body, Level::DEFAULT).unwrap(), body);
    }

    #[test]
    fn test_decode_garbage() {
        let err = Encoding::Gzip.decode(b"definitely not gzip").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData);
    }
}
