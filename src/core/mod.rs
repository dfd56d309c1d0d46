//! Core scheduling abstractions: tasks, correlation and result handling.

pub mod awaitable;
pub mod buffer;
pub mod error;
pub mod handle;
pub mod notification;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod task;

pub use awaitable::{AwaitSlot, AwaitState, AwaitedStep, CallbackAwaitable, WaitPolicy, Wake};
pub use buffer::{ItemDefId, ItemInstanceId, ItemRecord, ResultBuffer};
pub use error::{AppResult, BridgeError, RegistryError};
pub use handle::{Channel, CompletionHandle, CorrelationKey, ResultCode, Topic};
pub use notification::{CallPayload, Notification, NotificationSink};
pub use protocol::{collect_result_items, ReleaseGuard};
pub use registry::{CorrelationRegistry, SubscriptionId};
pub use scheduler::{SchedulerStats, TaskScheduler};
pub use task::{resolve, BlockingStep, Continuations, TaskContext, TaskId, TaskKind, WorkerTask};
