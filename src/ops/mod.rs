//! Operation steps, one module per family.
//!
//! Each step plugs into a [`WorkerTask`](crate::core::WorkerTask): blocking
//! steps implement [`BlockingStep`](crate::core::BlockingStep), callback-awaited
//! ones implement [`AwaitedStep`](crate::core::AwaitedStep).

pub mod archive;
pub mod cloud;
pub mod inventory;
pub mod session;
pub mod stats;

pub use archive::{CreateArchive, ExtractArchive};
pub use cloud::{DeleteFile, GetCloudQuota, ReadTextFromFile, SaveFilesToCloud, SaveTextToFile};
pub use inventory::{InventorySnapshot, InventoryStep, StartPurchase};
pub use session::{AuthSessionTicket, AuthTicket, EncryptedAppTicket, PlayerCount};
pub use stats::{ActivateAchievement, ClearAchievement, GetAchievement};
