//! Gateway constraint reconciliation.
//!
//! [`reconcile`] takes a proposed `{bind, auth, exposure}` triple and returns a
//! corrected triple plus the list of corrections applied. Rules run in a fixed
//! order and later rules may override earlier ones:
//!
//! 1. exposure != off and bind != loopback  => bind = loopback
//! 2. auth == off and bind != loopback      => auth = token (minting one if absent)
//! 3. exposure == funnel and auth != password => auth = password
//!
//! The function is pure apart from the injected token minter, which is only
//! called when rule 2 fires without an existing token. Re-applying it to its
//! own output yields no corrections.

use std::fmt;

use crate::error::InvariantViolation;
use crate::types::{AuthMode, BindMode, ExposureMode};

/// Proposed gateway settings, straight from user answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayProposal {
    pub bind: BindMode,
    pub auth_mode: AuthMode,
    pub exposure_mode: ExposureMode,
    /// Token already known for this gateway, if any.
    pub token: Option<String>,
}

/// One adjustment made by [`reconcile`], rendered as a user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    BindForcedLoopback { from: BindMode },
    AuthForcedToken { token_generated: bool },
    AuthForcedPassword { from: AuthMode },
}

impl Correction {
    pub fn message(&self) -> &'static str {
        match self {
            Correction::BindForcedLoopback { .. } => {
                "Tunnel exposure requires bind=loopback. Adjusting bind to loopback."
            }
            Correction::AuthForcedToken { .. } => {
                "Non-loopback bind requires auth. Switching to token auth."
            }
            Correction::AuthForcedPassword { .. } => "Funnel exposure requires password auth.",
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub bind: BindMode,
    pub auth_mode: AuthMode,
    pub exposure_mode: ExposureMode,
    pub token: Option<String>,
    pub corrections: Vec<Correction>,
}

impl Reconciled {
    /// Password mode was forced on; the caller has to collect one.
    pub fn password_required(&self) -> bool {
        self.corrections
            .iter()
            .any(|c| matches!(c, Correction::AuthForcedPassword { .. }))
    }

    pub fn as_proposal(&self) -> GatewayProposal {
        GatewayProposal {
            bind: self.bind,
            auth_mode: self.auth_mode,
            exposure_mode: self.exposure_mode,
            token: self.token.clone(),
        }
    }
}

/// Apply the bind/auth/exposure rules to `proposal`.
pub fn reconcile(proposal: &GatewayProposal, mint_token: impl FnOnce() -> String) -> Reconciled {
    let mut bind = proposal.bind;
    let mut auth_mode = proposal.auth_mode;
    let exposure_mode = proposal.exposure_mode;
    let mut token = proposal.token.clone().filter(|t| !t.trim().is_empty());
    let mut corrections = Vec::new();

    if exposure_mode != ExposureMode::Off && bind != BindMode::Loopback {
        corrections.push(Correction::BindForcedLoopback { from: bind });
        bind = BindMode::Loopback;
    }

    if auth_mode == AuthMode::Off && bind != BindMode::Loopback {
        let token_generated = token.is_none();
        if token_generated {
            token = Some(mint_token());
        }
        corrections.push(Correction::AuthForcedToken { token_generated });
        auth_mode = AuthMode::Token;
    }

    if exposure_mode == ExposureMode::Funnel && auth_mode != AuthMode::Password {
        corrections.push(Correction::AuthForcedPassword { from: auth_mode });
        auth_mode = AuthMode::Password;
    }

    Reconciled {
        bind,
        auth_mode,
        exposure_mode,
        token,
        corrections,
    }
}

/// Check the invariants [`reconcile`] guarantees on its output.
pub fn check_invariants(
    bind: BindMode,
    auth_mode: AuthMode,
    exposure_mode: ExposureMode,
) -> Result<(), InvariantViolation> {
    if exposure_mode != ExposureMode::Off && bind != BindMode::Loopback {
        return Err(InvariantViolation("tunnel exposure requires loopback bind"));
    }
    if auth_mode == AuthMode::Off && bind != BindMode::Loopback {
        return Err(InvariantViolation("auth off requires loopback bind"));
    }
    if exposure_mode == ExposureMode::Funnel && auth_mode != AuthMode::Password {
        return Err(InvariantViolation("funnel exposure requires password auth"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
