//! # Sample Constants
//!
//! Default identifiers, timeouts and the console messages printed by the sample.

use uuid::Uuid;

/// Placeholder remote identifier. Replace it with the identifier issued for the app's
/// registered identity with the push backend.
pub const DEFAULT_REMOTE_ID: Uuid = Uuid::nil();

/// Class id of the in-process activator; must match the one declared in the app manifest.
pub const DEFAULT_ACTIVATOR_CLSID: Uuid = Uuid::from_u128(0xccd2ae3f_764f_4ae3_be45_9804761b28b2);

/// How long a channel request may stay pending before it is cancelled.
pub const DEFAULT_CHANNEL_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Longest channel lifetime the simulation accepts, one hundred years.
pub const MAX_CHANNEL_LIFETIME_HOURS: i64 = 24 * 365 * 100;

/// chrono rendering of `on {month.abbreviated} {day}, {year} at {hour}:{minute}:{second}`.
pub const EXPIRATION_FORMAT: &str = "on %b %-d, %Y at %-H:%M:%S";

/// Lines written to the console by the sample.
pub mod messages {
    pub const CHANNEL_REQUEST_IN_PROGRESS: &str = "Channel URI request is in progress.";
    pub const CHANNEL_URI_PREFIX: &str = "Channel URI: ";
    pub const CHANNEL_EXPIRES_PREFIX: &str = "The channel URI will expire ";
    pub const CHANNEL_ERROR: &str = "There was an error obtaining the channel URI";
    pub const FOREGROUND_PREFIX: &str = "Push notification content received from FOREGROUND: ";
    pub const BACKGROUND_PREFIX: &str = "Push notification content received from BACKGROUND: ";
    pub const PRESS_ENTER_ANY_TIME: &str = "Press 'Enter' at any time to exit App.";
    pub const PRESS_ENTER: &str = "Press 'Enter' to exit the App.";
    pub const UNEXPECTED_ACTIVATION: &str = "Unexpected activation type";
}
