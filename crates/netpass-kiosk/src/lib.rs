//! Token-to-profile association for a multi-player kiosk.
//!
//! A scanned pass is placed into a free player slot, its profile is fetched
//! from the profile service in the background, and the slot becomes ready
//! for the game to load. Saving uploads the updated profile and releases
//! the slot. The real-time loop only ever calls [`NetPassRuntime::tick`],
//! which never blocks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use netpass_core::{SlotIndex, SlotState};
//! use netpass_hardware::mock::MockChannel;
//! use netpass_kiosk::{KioskConfig, NetPassRuntime, Notification, StaticEnvironment};
//! use netpass_network::MemoryTransferClient;
//!
//! let config = KioskConfig::default();
//! let (reader, handle) = MockChannel::new();
//! let service = MemoryTransferClient::new().with_auto_provision();
//! let env = Arc::new(StaticEnvironment::new(config.slots));
//!
//! let mut runtime =
//!     NetPassRuntime::start(&config, reader, service, env, Vec::<Notification>::new()).unwrap();
//!
//! handle.present("0004417023").unwrap();
//! for _ in 0..500 {
//!     runtime.tick();
//!     if runtime.state(SlotIndex::new(0)).unwrap() == SlotState::Ready {
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//!
//! assert_eq!(runtime.state(SlotIndex::new(0)).unwrap(), SlotState::Ready);
//! runtime.shutdown();
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod runtime;

pub use config::{HardwareConfig, KioskConfig, NetworkConfig, RejectMode};
pub use environment::{Environment, StaticEnvironment};
pub use error::{KioskError, Result};
pub use notify::{Notification, NotificationSink, RejectReason};
pub use orchestrator::{Orchestrator, ProfileTarget, SlotSnapshot, TickReport};
pub use runtime::NetPassRuntime;
