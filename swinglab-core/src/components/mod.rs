//! Component traits: the two strategy seams the engine consumes.
//!
//! - Scanner: given a point-in-time view, proposes ranked entry candidates
//! - Exit strategy: given an open position, decides whether to close all or part of it
//!
//! Plus the indicator trait both of them compute from.

pub mod exit;
pub mod indicator;
pub mod scanner;

pub use exit::{ExitStrategy, ScaledSwingExit, SwingExit, SwingParams};
pub use indicator::Indicator;
pub use scanner::{BreakoutScanner, PullbackScanner, Scanner};
