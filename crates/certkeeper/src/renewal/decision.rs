//! The renew-or-skip decision.

use std::fmt;

/// Renew when this many days or fewer remain
pub const RENEWAL_THRESHOLD_DAYS: i64 = 21;

/// How the issuer proves control over the domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenewalMode {
    /// certbot's own listener on the validation port; needs the firewall opened
    Standalone,
    /// Challenge files placed in a directory the running web server already serves
    Webroot,
}

impl RenewalMode {
    pub fn from_standalone(standalone: bool) -> Self {
        if standalone {
            Self::Standalone
        } else {
            Self::Webroot
        }
    }

    pub fn needs_firewall(&self) -> bool {
        matches!(self, Self::Standalone)
    }
}

impl fmt::Display for RenewalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Webroot => write!(f, "webroot"),
        }
    }
}

/// Whether a certificate is due
///
/// True if renewal is forced, no certificate exists yet, or at most
/// [`RENEWAL_THRESHOLD_DAYS`] remain.
pub fn needs_renewal(forced: bool, days_remaining: Option<i64>) -> bool {
    match days_remaining {
        _ if forced => true,
        None => true,
        Some(days) => days <= RENEWAL_THRESHOLD_DAYS,
    }
}

/// Result of evaluating one certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalDecision {
    pub forced: bool,
    pub days_remaining: Option<i64>,
    pub should_renew: bool,
    pub mode: RenewalMode,
}

impl RenewalDecision {
    pub fn new(forced: bool, days_remaining: Option<i64>, mode: RenewalMode) -> Self {
        Self {
            forced,
            days_remaining,
            should_renew: needs_renewal(forced, days_remaining),
            mode,
        }
    }

    /// Short reason for logs
    pub fn reason(&self) -> &'static str {
        match (self.should_renew, self.days_remaining) {
            (false, _) => "certificate still valid",
            (true, _) if self.forced => "renewal forced",
            (true, None) => "no certificate yet",
            (true, Some(days)) if days < 0 => "certificate expired",
            (true, Some(_)) => "certificate expires soon",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundary() {
        assert!(needs_renewal(false, Some(21)));
        assert!(!needs_renewal(false, Some(22)));
        assert!(needs_renewal(false, Some(0)));
        assert!(needs_renewal(false, Some(-5)));
    }

    #[test]
    fn test_absent_certificate() {
        assert!(needs_renewal(false, None));
        assert!(needs_renewal(true, None));
    }

    #[test]
    fn test_decision_reasons() {
        let mode = RenewalMode::Webroot;
        assert_eq!(RenewalDecision::new(false, Some(60), mode).reason(), "certificate still valid");
        assert_eq!(RenewalDecision::new(true, Some(60), mode).reason(), "renewal forced");
        assert_eq!(RenewalDecision::new(false, None, mode).reason(), "no certificate yet");
        assert_eq!(RenewalDecision::new(false, Some(-1), mode).reason(), "certificate expired");
        assert_eq!(RenewalDecision::new(false, Some(5), mode).reason(), "certificate expires soon");
    }

    #[test]
    fn test_mode() {
        assert_eq!(RenewalMode::from_standalone(true), RenewalMode::Standalone);
        assert_eq!(RenewalMode::from_standalone(false), RenewalMode::Webroot);
        assert!(RenewalMode::Standalone.needs_firewall());
        assert!(!RenewalMode::Webroot.needs_firewall());
        assert_eq!(RenewalMode::Standalone.to_string(), "standalone");
    }

    proptest! {
        #[test]
        fn healthy_certificates_are_skipped(days in (RENEWAL_THRESHOLD_DAYS + 1)..=10_000i64) {
            prop_assert!(!needs_renewal(false, Some(days)));
        }

        #[test]
        fn expiring_certificates_are_renewed(days in -10_000i64..=RENEWAL_THRESHOLD_DAYS) {
            prop_assert!(needs_renewal(false, Some(days)));
        }

        #[test]
        fn forced_always_renews(days in proptest::option::of(any::<i64>())) {
            prop_assert!(needs_renewal(true, days));
        }

        #[test]
        fn decision_matches_rule(forced in any::<bool>(), days in proptest::option::of(-400i64..400)) {
            let decision = RenewalDecision::new(forced, days, RenewalMode::Standalone);
            prop_assert_eq!(decision.should_renew, needs_renewal(forced, days));
            prop_assert_eq!(decision.days_remaining, days);
            prop_assert_eq!(decision.forced, forced);
        }
    }
}
