// Draw Lottery
// Participants draw from a shared prize pool under per-participant exclusions.
// A finished run packs into a single shareable token and can be kept in a
// remote store.

// Core modules
pub mod error;
pub mod state;
pub mod utils;

// Drawing
pub mod controller;
pub mod engine;

// Host intents
pub mod instruction;
pub mod processor;

// Sharing and persistence
pub mod codec;
pub mod config;
pub mod gateway;
pub mod session;

pub use controller::{DrawRecord, RunController};
pub use error::{LotteryError, LotteryResult};
pub use gateway::{LotteryGateway, RunSummary, SaveReceipt};
pub use state::{Participant, ParticipantId, Prize, PrizeId, Run, RunPhase};
