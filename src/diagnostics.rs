//! Environment diagnostics for the embedded call workspace
//!
//! Before the vendor SDK is allowed to initialize, the environment is probed
//! for the two conditions that are known to make the embedded workspace
//! unusable: third-party cookies being blocked, and an unsupported browser.
//! Both checks are side-effect free; they return data and the caller decides
//! how to react.
//!
//! A failed cookie probe or an unsupported browser is terminal for the
//! session. A browser that merely *requires configuration* (Safari and its
//! third-party cookie settings) is advisory only - initialization continues
//! with a warning.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::diagnostics::classify_browser;
//!
//! let chrome = classify_browser(
//!     "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
//!      Chrome/120.0.0.0 Safari/537.36",
//! );
//! assert!(chrome.is_supported);
//! assert!(!chrome.requires_configuration);
//!
//! let safari = classify_browser(
//!     "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
//!      (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
//! );
//! assert!(safari.is_supported);
//! assert!(safari.requires_configuration);
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

/// Result of the third-party cookie probe
#[derive(Debug, Clone)]
pub struct CookieSupport {
    /// Whether third-party cookies appear to be usable
    pub supported: bool,
    /// Which probe technique produced the verdict
    pub method: String,
    /// Free-form detail for logging and support tickets
    pub details: Option<String>,
}

/// Browser classification derived from the user-agent string
#[derive(Debug, Clone)]
pub struct BrowserCompatibility {
    /// Whether the embedded workspace can run in this browser at all
    pub is_supported: bool,
    /// Whether the browser needs settings changes before cookies will work
    pub requires_configuration: bool,
    /// Human-readable browser name
    pub name: String,
    /// Concrete advice to show the user, when there is any
    pub recommendation: Option<String>,
}

/// A single environment problem found during diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticIssue {
    /// Third-party cookies are blocked or the probe failed
    CookiesBlocked,
    /// The browser cannot run the embedded workspace
    BrowserUnsupported {
        /// Detected browser name
        name: String,
    },
    /// The browser works but needs configuration changes
    BrowserNeedsConfiguration {
        /// Detected browser name
        name: String,
    },
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticIssue::CookiesBlocked => write!(f, "third-party cookies blocked"),
            DiagnosticIssue::BrowserUnsupported { name } => {
                write!(f, "unsupported browser: {name}")
            }
            DiagnosticIssue::BrowserNeedsConfiguration { name } => {
                write!(f, "browser needs configuration: {name}")
            }
        }
    }
}

/// Complete output of an environment diagnostics run
#[derive(Debug, Clone)]
pub struct DiagnosticsReport {
    /// Cookie probe result
    pub cookies: CookieSupport,
    /// Browser classification
    pub browser: BrowserCompatibility,
    /// Ordered list of issues found, advisory ones included
    pub issues: Vec<DiagnosticIssue>,
}

impl DiagnosticsReport {
    /// Whether any issue is terminal for this session
    ///
    /// Advisory issues ([`DiagnosticIssue::BrowserNeedsConfiguration`]) do
    /// not make the report fatal.
    pub fn is_fatal(&self) -> bool {
        self.issues.iter().any(|issue| {
            matches!(
                issue,
                DiagnosticIssue::CookiesBlocked | DiagnosticIssue::BrowserUnsupported { .. }
            )
        })
    }
}

/// Access to the host environment the workspace will be embedded in
///
/// The probe is injected so the controller can be exercised against a
/// simulated environment in tests, and so the cookie probe technique can
/// differ per host shell without the controller caring.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    /// Best-effort probe for third-party cookie support
    ///
    /// Performed once per session, no retries; a negative result is
    /// terminal for the session.
    async fn third_party_cookies(&self) -> CookieSupport;

    /// The user-agent string of the host browser
    fn user_agent(&self) -> String;
}

/// Classify a user-agent string into a [`BrowserCompatibility`]
///
/// Detection order matters: Chromium-derived browsers embed `Safari/` in
/// their user-agent, and Edge embeds `Chrome/`, so the most specific token
/// is checked first.
pub fn classify_browser(user_agent: &str) -> BrowserCompatibility {
    let ua = user_agent.to_lowercase();

    if ua.contains("edg/") {
        return BrowserCompatibility {
            is_supported: true,
            requires_configuration: false,
            name: "Microsoft Edge".to_string(),
            recommendation: None,
        };
    }
    if ua.contains("chrome/") || ua.contains("chromium/") {
        return BrowserCompatibility {
            is_supported: true,
            requires_configuration: false,
            name: "Chrome".to_string(),
            recommendation: None,
        };
    }
    if ua.contains("firefox/") {
        return BrowserCompatibility {
            is_supported: true,
            requires_configuration: false,
            name: "Firefox".to_string(),
            recommendation: None,
        };
    }
    if ua.contains("safari/") {
        return BrowserCompatibility {
            is_supported: true,
            requires_configuration: true,
            name: "Safari".to_string(),
            recommendation: Some(
                "Safari blocks third-party cookies by default. Disable \
                 'Prevent cross-site tracking' in Safari settings, or use \
                 Chrome or Firefox."
                    .to_string(),
            ),
        };
    }
    if ua.contains("msie") || ua.contains("trident/") {
        return BrowserCompatibility {
            is_supported: false,
            requires_configuration: false,
            name: "Internet Explorer".to_string(),
            recommendation: Some(
                "Internet Explorer is not supported. Use Chrome, Firefox or Edge.".to_string(),
            ),
        };
    }

    BrowserCompatibility {
        is_supported: false,
        requires_configuration: false,
        name: "Unknown".to_string(),
        recommendation: Some(
            "This browser could not be identified. Use a recent version of \
             Chrome, Firefox or Edge."
                .to_string(),
        ),
    }
}

/// Run the full diagnostics pass against an environment
///
/// No side effects beyond the probe itself; the caller reacts to the
/// returned report. Issues are ordered cookie check first, matching the
/// order the checks run in.
pub async fn run_diagnostics(env: &dyn EnvironmentProbe) -> DiagnosticsReport {
    let cookies = env.third_party_cookies().await;
    debug!(
        supported = cookies.supported,
        method = %cookies.method,
        "third-party cookie probe finished"
    );

    let browser = classify_browser(&env.user_agent());
    debug!(
        browser = %browser.name,
        supported = browser.is_supported,
        requires_configuration = browser.requires_configuration,
        "browser classified"
    );

    let mut issues = Vec::new();
    if !cookies.supported {
        issues.push(DiagnosticIssue::CookiesBlocked);
    }
    if !browser.is_supported {
        issues.push(DiagnosticIssue::BrowserUnsupported {
            name: browser.name.clone(),
        });
    } else if browser.requires_configuration {
        issues.push(DiagnosticIssue::BrowserNeedsConfiguration {
            name: browser.name.clone(),
        });
    }

    if !issues.is_empty() {
        warn!(issue_count = issues.len(), "environment diagnostics found issues");
    }

    DiagnosticsReport {
        cookies,
        browser,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                           (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const FIREFOX_UA: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                             AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
    const IE_UA: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko";

    #[test]
    fn chromium_family_is_supported() {
        for ua in [CHROME_UA, EDGE_UA, FIREFOX_UA] {
            let browser = classify_browser(ua);
            assert!(browser.is_supported, "ua: {ua}");
            assert!(!browser.requires_configuration, "ua: {ua}");
        }
    }

    #[test]
    fn edge_is_not_mistaken_for_chrome() {
        assert_eq!(classify_browser(EDGE_UA).name, "Microsoft Edge");
        assert_eq!(classify_browser(CHROME_UA).name, "Chrome");
    }

    #[test]
    fn safari_is_advisory_only() {
        let browser = classify_browser(SAFARI_UA);
        assert!(browser.is_supported);
        assert!(browser.requires_configuration);
        assert!(browser.recommendation.is_some());
    }

    #[test]
    fn internet_explorer_is_terminal() {
        let browser = classify_browser(IE_UA);
        assert!(!browser.is_supported);
    }

    struct FixedEnv {
        cookies: bool,
        ua: &'static str,
    }

    #[async_trait]
    impl EnvironmentProbe for FixedEnv {
        async fn third_party_cookies(&self) -> CookieSupport {
            CookieSupport {
                supported: self.cookies,
                method: "fixed".to_string(),
                details: None,
            }
        }

        fn user_agent(&self) -> String {
            self.ua.to_string()
        }
    }

    #[tokio::test]
    async fn blocked_cookies_make_the_report_fatal() {
        let env = FixedEnv {
            cookies: false,
            ua: CHROME_UA,
        };
        let report = run_diagnostics(&env).await;
        assert!(report.is_fatal());
        assert_eq!(report.issues, vec![DiagnosticIssue::CookiesBlocked]);
    }

    #[tokio::test]
    async fn advisory_issue_is_not_fatal() {
        let env = FixedEnv {
            cookies: true,
            ua: SAFARI_UA,
        };
        let report = run_diagnostics(&env).await;
        assert!(!report.is_fatal());
        assert_eq!(report.issues.len(), 1);
    }

    #[tokio::test]
    async fn clean_environment_has_no_issues() {
        let env = FixedEnv {
            cookies: true,
            ua: CHROME_UA,
        };
        let report = run_diagnostics(&env).await;
        assert!(!report.is_fatal());
        assert!(report.issues.is_empty());
    }
}
