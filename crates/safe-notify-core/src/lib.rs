pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod format;
pub mod health;
pub mod router;
pub mod sink;
pub mod throttle;
pub mod types;

pub use config::{
    create_default_config, validate_config, CoordinatorConfig, NotificationConfig,
    NotificationConfigPatch,
};
pub use coordinator::{CoordinatorStats, NotificationCoordinator};
pub use dispatcher::{DispatcherStats, NotificationDispatcher};
pub use error::{NotifyError, Result};
pub use event::EventPayload;
pub use sink::{LogSink, MemorySink, MessageSink, OutboundMessage, SinkAdapter};
