//! Achievement operations.

use crate::core::error::BridgeError;
use crate::core::task::{BlockingStep, TaskContext};

/// Operation name of [`ActivateAchievement`].
pub const ACTIVATE_ACHIEVEMENT: &str = "activate_achievement";
/// Operation name of [`GetAchievement`].
pub const GET_ACHIEVEMENT: &str = "get_achievement";
/// Operation name of [`ClearAchievement`].
pub const CLEAR_ACHIEVEMENT: &str = "clear_achievement";

const INVALID_NAME: &str = "achievement name is not valid";

/// Unlock an achievement and upload stats.
#[derive(Debug, Clone)]
pub struct ActivateAchievement {
    name: String,
}

impl ActivateAchievement {
    /// Unlock `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BlockingStep for ActivateAchievement {
    type Output = ();

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<(), BridgeError> {
        if !ctx.platform.set_achievement(&self.name) {
            return Err(BridgeError::rejected(ACTIVATE_ACHIEVEMENT, INVALID_NAME));
        }
        if !ctx.platform.store_stats() {
            return Err(BridgeError::rejected(
                ACTIVATE_ACHIEVEMENT,
                "error on storing user achievement",
            ));
        }
        Ok(())
    }
}

/// Whether an achievement is unlocked.
#[derive(Debug, Clone)]
pub struct GetAchievement {
    name: String,
}

impl GetAchievement {
    /// Query `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BlockingStep for GetAchievement {
    type Output = bool;

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<bool, BridgeError> {
        ctx.platform
            .get_achievement(&self.name)
            .ok_or_else(|| BridgeError::rejected(GET_ACHIEVEMENT, INVALID_NAME))
    }
}

/// Re-lock an achievement and upload stats.
#[derive(Debug, Clone)]
pub struct ClearAchievement {
    name: String,
}

impl ClearAchievement {
    /// Re-lock `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl BlockingStep for ClearAchievement {
    type Output = ();

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<(), BridgeError> {
        if !ctx.platform.clear_achievement(&self.name) {
            return Err(BridgeError::rejected(CLEAR_ACHIEVEMENT, INVALID_NAME));
        }
        if !ctx.platform.store_stats() {
            return Err(BridgeError::rejected(
                CLEAR_ACHIEVEMENT,
                "failed to upload user stats to the server",
            ));
        }
        Ok(())
    }
}
