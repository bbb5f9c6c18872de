//! Handling of errors that indicate a programming mistake rather than a runtime condition.

use std::error::Error;

/// What to do when a caller misuses a store, e.g. records the same transaction hash twice.
///
/// Misuse is loud during development and logged in production, where crashing the session
/// would cost the user more than the inconsistency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MisusePolicy {
    /// Panic with the error message.
    Panic,
    /// Log the error and carry on.
    Log,
}

impl Default for MisusePolicy {
    fn default() -> Self {
        Self::from_build()
    }
}

impl MisusePolicy {
    /// `Panic` for debug builds, `Log` for release builds.
    pub const fn from_build() -> Self {
        if cfg!(debug_assertions) { Self::Panic } else { Self::Log }
    }

    /// Resolves an optional strictness override, falling back to [`Self::from_build`].
    pub const fn from_strict(strict: Option<bool>) -> Self {
        match strict {
            Some(true) => Self::Panic,
            Some(false) => Self::Log,
            None => Self::from_build(),
        }
    }

    /// Reports a misuse error according to the policy.
    #[track_caller]
    pub fn report(self, err: &(dyn Error + 'static)) {
        match self {
            Self::Panic => panic!("internal misuse: {err}"),
            Self::Log => error!(target: "misuse", %err, "internal misuse ignored"),
        }
    }
}
