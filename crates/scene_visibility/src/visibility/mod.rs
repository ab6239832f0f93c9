//! Visibility determination
//!
//! Tests which scene entities are visible from a camera or light volume and
//! collects them, grouped by render category, into arena-backed result
//! containers.

pub mod node;
pub mod results;
pub mod scheduler;
pub mod tester;
pub mod view;

#[cfg(test)]
mod tests;

pub use node::{SubShapeSet, VisibleNode};
pub use results::{GroupReserve, NodeArena, VisibilityGroup, VisibilityTestResults};
pub use scheduler::{SchedulerError, VisibilityJob, VisibilityScheduler};
pub use tester::{TestState, VisibilityTester};
pub use view::{ViewKind, VisibilityTest, VisibilityView};
