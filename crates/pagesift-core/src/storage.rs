//! Object-storage sink interface
//!
//! The extraction core never uploads; the separate media-fetch function
//! does. Only the interface is defined here so that function can be written
//! against it.

use crate::Result;

/// A remote object store accepting byte payloads under a destination key.
///
/// Implementations return the publicly addressable URL of the stored
/// object, or a transport error. Retry policy belongs to the caller.
pub trait ObjectSink {
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}
