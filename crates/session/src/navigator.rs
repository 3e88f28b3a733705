//! Redirect hook used when the session is forcibly ended

use tracing::warn;

/// Moves the user to another view
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, path: &str) {
        self(path);
    }
}

/// Navigator for headless front ends: reports the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, path: &str) {
        warn!(path, "Session ended, redirecting");
    }
}
