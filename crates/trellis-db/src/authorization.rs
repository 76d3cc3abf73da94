//! Trellis Authorization - Ambient Identity and Permission Gate
//!
//! The gate evaluates a document's permission set for one action against
//! the roles held by the ambient identity. Identity and gate status are
//! process-wide: every engine instance in the process observes the same
//! caller, and engines sharing a namespace, adapter, and cache coordinate
//! through the backend rather than through per-engine identities.
//!
//! `skip` and `disable`/`reset` are scoped primitives. Both nest, and both
//! restore the prior state on every exit path, panics included.
//!
//! @version 0.1.0
//! @author Trellis Development Team

use once_cell::sync::Lazy;
use parking_lot::Mutex;

struct AuthState {
    roles: Vec<String>,
    status: bool,
    default_status: bool,
}

impl AuthState {
    fn new() -> Self {
        Self {
            roles: vec!["any".to_string()],
            status: true,
            default_status: true,
        }
    }
}

static STATE: Lazy<Mutex<AuthState>> = Lazy::new(|| Mutex::new(AuthState::new()));

// =============================================================================
// Authorization
// =============================================================================

/// The permission gate and ambient identity oracle.
pub struct Authorization;

impl Authorization {
    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    /// Grant a role to the ambient identity.
    pub fn set_role(role: impl Into<String>) {
        let role = role.into();
        let mut state = STATE.lock();
        if !state.roles.contains(&role) {
            state.roles.push(role);
        }
    }

    /// Revoke a role from the ambient identity.
    pub fn unset_role(role: &str) {
        STATE.lock().roles.retain(|r| r != role);
    }

    /// The roles the ambient identity currently holds.
    pub fn roles() -> Vec<String> {
        STATE.lock().roles.clone()
    }

    /// Reset the ambient identity to the anonymous default.
    pub fn clean_roles() {
        STATE.lock().roles = vec!["any".to_string()];
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Whether the ambient identity satisfies a permission role set.
    ///
    /// Always valid while the gate is skipped or disabled.
    pub fn is_valid(permitted: &[String]) -> bool {
        let state = STATE.lock();
        if !state.status {
            return true;
        }
        permitted.iter().any(|role| state.roles.contains(role))
    }

    /// Whether the gate is currently enforcing.
    pub fn status() -> bool {
        STATE.lock().status
    }

    // -------------------------------------------------------------------------
    // Scoped primitives
    // -------------------------------------------------------------------------

    /// Run `f` with the gate forced valid, restoring the prior state on exit.
    pub fn skip<T>(f: impl FnOnce() -> T) -> T {
        let _guard = StatusGuard::set(false);
        f()
    }

    /// Disable the gate until `reset` is called.
    pub fn disable() {
        STATE.lock().status = false;
    }

    /// Restore the gate to its default status.
    pub fn reset() {
        let mut state = STATE.lock();
        state.status = state.default_status;
    }

    /// Set the default status `reset` returns to, and apply it now.
    pub fn set_default_status(status: bool) {
        let mut state = STATE.lock();
        state.default_status = status;
        state.status = status;
    }

    /// Run `f` with the gate disabled, resetting on exit. Used by
    /// administrative listings.
    pub fn disabled<T>(f: impl FnOnce() -> T) -> T {
        let _guard = StatusGuard::set(false);
        f()
    }
}

/// Restores the prior gate status on drop, so scoped primitives unwind
/// correctly on error paths.
struct StatusGuard {
    prior: bool,
}

impl StatusGuard {
    fn set(status: bool) -> Self {
        let mut state = STATE.lock();
        let prior = state.status;
        state.status = status;
        Self { prior }
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        STATE.lock().status = self.prior;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // The oracle is process-wide; these tests must not interleave.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn reset_state() {
        Authorization::clean_roles();
        Authorization::set_default_status(true);
    }

    #[test]
    fn test_default_identity_is_any() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        assert!(Authorization::is_valid(&["any".to_string()]));
        assert!(!Authorization::is_valid(&["user:alice".to_string()]));
    }

    #[test]
    fn test_roles_grant_access() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        Authorization::set_role("user:alice");
        assert!(Authorization::is_valid(&["user:alice".to_string()]));

        Authorization::unset_role("user:alice");
        assert!(!Authorization::is_valid(&["user:alice".to_string()]));
    }

    #[test]
    fn test_skip_forces_validity() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        let inside = Authorization::skip(|| Authorization::is_valid(&["user:root".to_string()]));
        assert!(inside);
        assert!(!Authorization::is_valid(&["user:root".to_string()]));
    }

    #[test]
    fn test_skip_nests() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        Authorization::skip(|| {
            Authorization::skip(|| {
                assert!(!Authorization::status());
            });
            assert!(!Authorization::status());
        });
        assert!(Authorization::status());
    }

    #[test]
    fn test_skip_restores_on_panic() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        let result = std::panic::catch_unwind(|| {
            Authorization::skip(|| panic!("boom"));
        });
        assert!(result.is_err());
        assert!(Authorization::status());
    }

    #[test]
    fn test_disable_and_reset() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        Authorization::disable();
        assert!(Authorization::is_valid(&["user:nobody".to_string()]));
        Authorization::reset();
        assert!(!Authorization::is_valid(&["user:nobody".to_string()]));
    }

    #[test]
    fn test_identity_is_shared_across_threads() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        Authorization::set_role("user:alice");

        let seen = std::thread::spawn(|| Authorization::roles())
            .join()
            .expect("thread panicked");
        assert!(seen.contains(&"user:alice".to_string()));

        Authorization::clean_roles();
    }

    #[test]
    fn test_empty_permission_set_denies() {
        let _lock = TEST_LOCK.lock();
        reset_state();
        assert!(!Authorization::is_valid(&[]));
    }
}
