pub mod config;
pub mod metrics;
pub mod notify;
pub mod poller;
pub mod render;
pub mod seen;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    SourceBackend,
};
pub use notify::{DeliveryError, Dispatcher, EmailDispatcher, Notification, TelegramDispatcher};
pub use poller::{CycleReport, LotPoller, PollError, PollState, PollStats, PollStatus};
pub use render::{DocumentRenderer, PdfRenderer, RenderError, RenderedDocument};
pub use seen::{SeenSet, SeenStore, StoreError};
pub use source::{
    ApiLotSource, CandidateLot, FedresursLotSource, LotSource, SourceError, TrackedEntity,
};
