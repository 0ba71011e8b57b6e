//! A reusable, growable encode buffer

use serde::Serialize;

use crate::{error::Error, ser::write_to_slice};

/// Default initial size of an [`EncodeBuffer`]
pub const DEFAULT_INITIAL_SIZE: usize = 128;

/// Default ceiling of an [`EncodeBuffer`]
pub const DEFAULT_LIMIT: usize = 1024 * 1024;

/// A buffer owned by the sending side and reused across encodes.
///
/// Encoding tries the current buffer first. On [`Error::Overflow`] the buffer
/// doubles and the encode is retried, until the value fits or the next size
/// would exceed the limit, in which case [`Error::BufferLimitExceeded`] is
/// returned.
#[derive(Debug)]
pub struct EncodeBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl Default for EncodeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE, DEFAULT_LIMIT)
    }
}

impl EncodeBuffer {
    /// Creates a buffer of `initial` bytes that never grows beyond `limit`
    pub fn new(initial: usize, limit: usize) -> Self {
        let initial = initial.clamp(1, limit.max(1));
        Self {
            buf: vec![0; initial],
            limit,
        }
    }

    /// Current capacity
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Maximum capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Encode a value and return the written bytes
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&[u8], Error> {
        loop {
            match write_to_slice(value, &mut self.buf) {
                Ok(n) => return Ok(&self.buf[..n]),
                Err(Error::Overflow { required, .. }) => {
                    let size = self.buf.len();
                    if size >= self.limit {
                        return Err(Error::BufferLimitExceeded {
                            required,
                            limit: self.limit,
                        });
                    }
                    let new_size = size.saturating_mul(2).min(self.limit);
                    self.buf.resize(new_size, 0);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Value};

    use super::EncodeBuffer;

    #[test]
    fn small_value_fits_without_growing() {
        let mut buf = EncodeBuffer::new(16, 64);
        let bytes = buf.encode(&Value::UInt(1)).unwrap();
        assert_eq!(bytes, &[0x52, 1]);
        assert_eq!(buf.size(), 16);
    }

    #[test]
    fn buffer_doubles_until_value_fits() {
        let mut buf = EncodeBuffer::new(4, 1024);
        let value = Value::from("a".repeat(40).as_str());
        let len = buf.encode(&value).unwrap().len();
        assert_eq!(len, 42);
        assert_eq!(buf.size(), 64);

        // the grown buffer is reused
        buf.encode(&Value::Null).unwrap();
        assert_eq!(buf.size(), 64);
    }

    #[test]
    fn growth_stops_at_limit() {
        let mut buf = EncodeBuffer::new(4, 48);
        let value = Value::from("a".repeat(100).as_str());
        assert!(matches!(
            buf.encode(&value),
            Err(Error::BufferLimitExceeded {
                required: 102,
                limit: 48
            })
        ));
        assert_eq!(buf.size(), 48);
    }
}
