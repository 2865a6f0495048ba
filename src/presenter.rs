use crate::identity::Route;

/// Host-side effects the core asks for. The console implements this on the terminal; tests
/// record the calls.
pub trait Presenter: Send + Sync {
    /// Blocking notification; returns once the user has seen it.
    fn notify(&self, message: &str);
    /// Routing directive.
    fn navigate(&self, route: Route);
    /// Explicit yes/no confirmation. `false` aborts the pending action.
    fn confirm(&self, prompt: &str) -> bool;
}
