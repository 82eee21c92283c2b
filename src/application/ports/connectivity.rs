use crate::shared::listeners::Subscription;

/// Online/offline view used by the executor and the status service.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    /// `callback` receives the new state on every transition.
    fn on_change(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> Subscription;
}
