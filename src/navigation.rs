//! Post-login/logout navigation.

use tracing::debug;

/// Navigation capability of the host application.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);
    fn reload(&self);
}

/// Navigator for hosts without navigation (CLIs, services).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, target: &str) {
        debug!(target, "navigation requested, ignoring");
    }

    fn reload(&self) {
        debug!("reload requested, ignoring");
    }
}

/// Per-call redirect override.
///
/// `From<bool>` mirrors the usual convention: `false` suppresses the
/// redirect, `true` reloads the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Redirect {
    /// Use the configured target for the operation.
    #[default]
    Default,
    Skip,
    To(String),
    Reload,
}

impl From<bool> for Redirect {
    fn from(value: bool) -> Self {
        if value {
            Self::Reload
        } else {
            Self::Skip
        }
    }
}

impl From<&str> for Redirect {
    fn from(target: &str) -> Self {
        Self::To(target.to_string())
    }
}

impl From<String> for Redirect {
    fn from(target: String) -> Self {
        Self::To(target)
    }
}

impl<T: Into<Redirect>> From<Option<T>> for Redirect {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Default, Into::into)
    }
}

impl Redirect {
    /// Perform the redirect; `Default` navigates only when `configured` is
    /// a non-empty target.
    pub fn apply(&self, navigator: &dyn Navigator, configured: Option<&str>) {
        match self {
            Self::Skip => {}
            Self::Reload => navigator.reload(),
            Self::To(target) => navigator.navigate(target),
            Self::Default => {
                if let Some(target) = configured.filter(|target| !target.is_empty()) {
                    navigator.navigate(target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl Navigator for Recording {
        fn navigate(&self, target: &str) {
            self.events.lock().unwrap().push(target.to_string());
        }

        fn reload(&self) {
            self.events.lock().unwrap().push("<reload>".to_string());
        }
    }

    #[test]
    fn default_uses_configured_target() {
        let nav = Recording::default();
        Redirect::Default.apply(&nav, Some("/home"));
        Redirect::Default.apply(&nav, None);
        Redirect::Default.apply(&nav, Some(""));
        assert_eq!(*nav.events.lock().unwrap(), vec!["/home".to_string()]);
    }

    #[test]
    fn overrides_win_over_configuration() {
        let nav = Recording::default();
        Redirect::from(false).apply(&nav, Some("nowhere"));
        Redirect::from("/elsewhere").apply(&nav, Some("nowhere"));
        Redirect::from(true).apply(&nav, Some("nowhere"));
        assert_eq!(
            *nav.events.lock().unwrap(),
            vec!["/elsewhere".to_string(), "<reload>".to_string()]
        );
    }

    #[test]
    fn none_option_means_default() {
        assert_eq!(Redirect::from(None::<&str>), Redirect::Default);
        assert_eq!(Redirect::from(Some(false)), Redirect::Skip);
    }
}
