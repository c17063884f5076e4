pub mod telegram;
pub mod throttle;

pub use telegram::{LogNotifier, TelegramNotifier};
pub use throttle::AlertThrottle;
