pub mod config;
pub mod config_loader;
pub mod market;
pub mod play;
pub mod traits;

pub use config::{
    AppConfig, GtdSettings, LivenessSettings, MonitorSettings, StoreSettings, TrailingSettings,
};
pub use config_loader::ConfigLoader;
pub use market::{is_market_open, CalendarEvent, EventKind, OptionGreeks, OptionQuote};
pub use play::{
    CloseType, ConditionalPlays, DynamicGtd, EntryPoint, ExitSpec, OrderKind, Play, PlayClass,
    PlayStatus, PolicyInstance, StatusBlock, TradeType, TrailAdjustment, TrailMode, TrailState,
    TrailingConfig,
};
pub use traits::{EventCalendar, MarketDataProvider};
