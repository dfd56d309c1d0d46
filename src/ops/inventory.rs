//! Inventory operations.
//!
//! Consume, exchange and fetch-all are callback-awaited and read their results
//! through the result-handle protocol. Purchase only opens the platform's
//! overlay, so it runs as a plain blocking step.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::awaitable::{AwaitedStep, Wake};
use crate::core::buffer::{ItemInstanceId, ItemRecord, ResultBuffer};
use crate::core::error::BridgeError;
use crate::core::handle::{Channel, CompletionHandle, Topic};
use crate::core::notification::Notification;
use crate::core::protocol::collect_result_items;
use crate::core::task::{BlockingStep, TaskContext};
use crate::platform::{ItemGrant, ItemSpend};

/// Operation name of [`InventoryStep::consume`].
pub const CONSUME_ITEM: &str = "consume_item";
/// Operation name of [`InventoryStep::exchange`].
pub const EXCHANGE_ITEMS: &str = "exchange_items";
/// Operation name of [`InventoryStep::fetch_all`].
pub const GET_ALL_ITEMS: &str = "get_all_items";
/// Operation name of [`StartPurchase`].
pub const START_PURCHASE: &str = "start_purchase";

const WRONG_CONTEXT: &str = "called from a game server context";

/// Items read back from an inventory result set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Records of the result set, in platform order.
    pub items: ResultBuffer<ItemRecord>,
    /// A catalog-changed broadcast arrived while the request was outstanding.
    pub full_update: bool,
}

#[derive(Debug, Clone)]
enum InventoryRequest {
    Consume {
        item: ItemInstanceId,
        quantity: u32,
    },
    Exchange {
        generate: Vec<ItemGrant>,
        destroy: Vec<ItemSpend>,
    },
    FetchAll,
}

/// Callback-awaited inventory request.
#[derive(Debug, Clone)]
pub struct InventoryStep {
    operation: &'static str,
    request: InventoryRequest,
    issued: Option<CompletionHandle>,
}

impl InventoryStep {
    /// Consume `quantity` units of an item instance.
    #[must_use]
    pub const fn consume(item: ItemInstanceId, quantity: u32) -> Self {
        Self {
            operation: CONSUME_ITEM,
            request: InventoryRequest::Consume { item, quantity },
            issued: None,
        }
    }

    /// Destroy `destroy` and generate `generate` in one transaction.
    #[must_use]
    pub const fn exchange(generate: Vec<ItemGrant>, destroy: Vec<ItemSpend>) -> Self {
        Self {
            operation: EXCHANGE_ITEMS,
            request: InventoryRequest::Exchange { generate, destroy },
            issued: None,
        }
    }

    /// Snapshot every item the user owns.
    #[must_use]
    pub const fn fetch_all() -> Self {
        Self {
            operation: GET_ALL_ITEMS,
            request: InventoryRequest::FetchAll,
            issued: None,
        }
    }

    /// Operation name for logs and errors.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }
}

impl AwaitedStep for InventoryStep {
    type Output = InventorySnapshot;

    fn channel(&self) -> Channel {
        Channel::Inventory
    }

    fn topics(&self) -> &'static [Topic] {
        match self.request {
            InventoryRequest::FetchAll => &[Topic::CatalogChanged],
            _ => &[],
        }
    }

    fn issue(&mut self, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError> {
        let platform = &ctx.platform;
        let handle = match &self.request {
            InventoryRequest::Consume { item, quantity } => platform
                .consume_item(*item, *quantity)
                .ok_or_else(|| BridgeError::rejected(self.operation, WRONG_CONTEXT))?,
            InventoryRequest::Exchange { generate, destroy } => platform
                .exchange_items(generate, destroy)
                .ok_or_else(|| {
                    BridgeError::rejected(self.operation, "items to generate must be exactly 1")
                })?,
            InventoryRequest::FetchAll => platform
                .get_all_items()
                .ok_or_else(|| BridgeError::rejected(self.operation, WRONG_CONTEXT))?,
        };
        self.issued = Some(handle);
        Ok(handle)
    }

    fn complete(self: Box<Self>, ctx: &TaskContext, wake: Wake) -> Result<InventorySnapshot, BridgeError> {
        match wake.notification {
            Notification::InventoryResultReady { handle, result } => {
                let items = collect_result_items(ctx.platform.as_ref(), self.operation, handle, result)?;
                debug!(operation = self.operation, handle = %handle, count = items.len(), "inventory result collected");
                Ok(InventorySnapshot {
                    items,
                    full_update: wake.catalog_changed,
                })
            }
            other => {
                warn!(operation = self.operation, notification = ?other, "unexpected completion for inventory request");
                if let Some(handle) = self.issued {
                    ctx.platform.destroy_result(handle);
                }
                Err(BridgeError::UnexpectedNotification {
                    operation: self.operation,
                })
            }
        }
    }

    fn abandon(self: Box<Self>, ctx: &TaskContext, handle: CompletionHandle) {
        debug!(operation = self.operation, handle = %handle, "releasing result set of abandoned request");
        ctx.platform.destroy_result(handle);
    }
}

/// Open the purchase flow for a set of item definitions. Yields the call handle.
#[derive(Debug, Clone)]
pub struct StartPurchase {
    items: Vec<ItemGrant>,
}

impl StartPurchase {
    /// Purchase `items`.
    #[must_use]
    pub const fn new(items: Vec<ItemGrant>) -> Self {
        Self { items }
    }
}

impl BlockingStep for StartPurchase {
    type Output = CompletionHandle;

    fn execute(self: Box<Self>, ctx: &TaskContext) -> Result<CompletionHandle, BridgeError> {
        ctx.platform
            .start_purchase(&self.items)
            .ok_or_else(|| BridgeError::rejected(START_PURCHASE, "invalid api call handle"))
    }
}
