#![allow(clippy::doc_markdown)] // Allow technical terms like URI, CLSID in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Push Notify
//!
//! Client side of a desktop push notification sample.
//!
//! ## Overview
//!
//! The process is started either by the user or by the OS because a notification arrived
//! while the app was not running. This crate dispatches on that activation, acquires a
//! push channel from the platform notification service and processes inbound payloads in
//! the foreground or in the background.
//!
//! ## Architecture
//!
//! The platform notification service is an opaque collaborator behind the
//! [`platform::PushNotificationManager`] and [`platform::AppInstance`] traits. Channel
//! negotiation, retry and the wire protocol belong to the service; this crate drives it
//! through the activation state machine and enforces the client-side rules:
//!
//! - at most one channel request in flight, bounded by a timeout after which the request
//!   is cancelled and no late result is delivered
//! - a background deferral is taken before the payload is processed and released exactly
//!   once afterwards
//! - foreground deliveries are marked handled so the OS does not re-deliver them
//! - the in-process activator is unregistered on exit while the push trigger stays
//!
//! ## Module Organization
//!
//! - [`activation`] - activation kinds, activator registration and the dispatcher
//! - [`channel`] - channels, the cancellable channel request and the negotiator
//! - [`notification`] - payloads, deferrals, foreground and background handlers
//! - [`state_machine`] - the activation lifecycle
//! - [`platform`] - the platform seam and its in-process simulation
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use push_notify::config::PushConfig;
//! use push_notify::console::StdConsole;
//! use push_notify::platform::SimulatedPlatform;
//! use push_notify::ActivationDispatcher;
//!
//! # async fn example() {
//! let config = PushConfig::default();
//! let platform = Arc::new(SimulatedPlatform::from_config(&config.simulation));
//! let dispatcher = ActivationDispatcher::new(
//!     &config,
//!     platform.clone(),
//!     platform,
//!     Arc::new(StdConsole::new()),
//! );
//!
//! let report = dispatcher.run().await;
//! println!("finished in state {}", report.final_state);
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod activation;
pub mod channel;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod logging;
pub mod notification;
pub mod platform;
pub mod state_machine;

pub use activation::{
    ActivationDispatcher, ActivationInfo, ActivationKind, ActivationRecord, DispatchReport,
    RegistrationActivators,
};
pub use channel::{
    Channel, ChannelNegotiator, ChannelProgress, ChannelRequestOutcome, ChannelResult,
    DeliveryOutcome, EventToken, NegotiatorStats, PushReceivedHandler,
};
pub use config::{ConfigManager, PushConfig};
pub use error::{ErrorCode, PushError, Result};
pub use notification::{Deferral, NotificationPayload, PushReceivedEventArgs};
pub use platform::{AppInstance, PushNotificationManager};
pub use state_machine::{ActivationEvent, ActivationState, ActivationStateMachine};
