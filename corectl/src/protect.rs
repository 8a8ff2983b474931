//! Traffic protection
//!
//! On Android the `VpnService` must be told which sockets or apps bypass the
//! tunnel, otherwise the core's own upstream traffic loops back into it. The
//! [`Protector`] trait lets the host wire that platform call in.

/// Excludes a socket or app from VPN routing.
pub trait Protector: Send + Sync {
    /// Protect the given identifier (socket fd, package name, ...).
    ///
    /// Returns `true` if the platform accepted the request.
    fn protect(&self, identifier: &str) -> bool;
}

/// Protector for platforms that need no protection; accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProtector;

impl Protector for NoOpProtector {
    fn protect(&self, _identifier: &str) -> bool {
        true
    }
}

/// A protector that calls a closure.
///
/// This is useful for creating protectors from FFI callbacks.
pub struct FnProtector<F> {
    protect_fn: F,
}

impl<F> FnProtector<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    /// Create a new function-based protector.
    pub fn new(f: F) -> Self {
        Self { protect_fn: f }
    }
}

impl<F> Protector for FnProtector<F>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn protect(&self, identifier: &str) -> bool {
        (self.protect_fn)(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_protector_delegates() {
        let protector = FnProtector::new(|id: &str| id.starts_with("fd:"));
        assert!(protector.protect("fd:42"));
        assert!(!protector.protect("com.example.app"));
    }

    #[test]
    fn test_noop_protector_accepts() {
        assert!(NoOpProtector.protect("anything"));
    }
}
