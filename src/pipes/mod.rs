pub mod format;
pub mod host;
pub mod time_ago;
pub mod timer;

pub use host::{ChangeDetector, ChannelDetector, DirectZone, NoopDetector, Zone};
pub use time_ago::{FormatFn, TimeAgoPipe};
