//! Login redirect collaborator.

/// Receives the forced-logout signal.
///
/// The client calls [`redirect_to_login`](Navigator::redirect_to_login) once
/// per unrecoverable session expiry, after the stored tokens are cleared.
/// Closures implement this trait, which keeps tests free of any real UI.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// A navigator that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {}
}
