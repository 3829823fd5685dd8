// Port traits the application layer depends on.

use crate::common::Result;
use crate::domain::behavior::{RawBehavior, ReducedBehaviors};

/// Persistence of one app's raw and reduced behaviors.
pub trait BehaviorStore {
    /// Raw behaviors if a usable file exists. An unreadable file is `None`.
    fn load_raw(&self) -> Result<Option<Vec<RawBehavior>>>;
    fn save_raw(&self, behaviors: &[RawBehavior]) -> Result<()>;
    fn remove_raw(&self) -> Result<()>;
    fn has_raw(&self) -> bool;

    fn load_reduced(&self) -> Result<ReducedBehaviors>;
    fn save_reduced(&self, reduced: ReducedBehaviors) -> Result<()>;
    /// True if a non-empty reduced file exists.
    fn has_reduced(&self) -> bool;
}
