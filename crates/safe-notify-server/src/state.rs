use std::sync::Arc;

use safe_notify_core::NotificationCoordinator;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<NotificationCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<NotificationCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safe_notify_core::config::create_default_config;
    use safe_notify_core::types::Environment;
    use safe_notify_core::MemorySink;

    #[test]
    fn state_shares_the_coordinator() {
        let coordinator = Arc::new(
            NotificationCoordinator::new(
                create_default_config(Environment::Staging),
                Arc::new(MemorySink::new()),
            )
            .unwrap(),
        );
        let state = AppState::new(Arc::clone(&coordinator));
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&cloned.coordinator, &coordinator));
        assert_eq!(cloned.coordinator.environment(), Environment::Staging);
    }
}
