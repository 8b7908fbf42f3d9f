//! Domain Layer - Core trading rules for the sniper
//!
//! Pure types and arithmetic with no I/O. Everything that touches the network
//! goes through the ports layer.
//!
//! - `candidate`: discovered pairs and the perfect-score filter
//! - `position`: open positions, profit target and exit policy
//! - `sizing`: basis-point math for purchase size and slippage bounds

pub mod candidate;
pub mod position;
pub mod sizing;

pub use candidate::{clamp_score, Candidate, DiscoveredPair, REQUIRED_SCORE};
pub use position::{target_price, ExitPolicy, ExitReason, Position, PositionError, SellSizing};
pub use sizing::{min_output, purchase_amount, BasisPoints, SizingError};
