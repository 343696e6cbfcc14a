use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{OrderId, OrderStatus, SortKey},
    protocol::{AckResponse, CreateOrderRequest, OrderRecord, UpdateOrderRequest},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

pub mod error;
pub mod form;
pub mod http_backend;
pub mod table;

pub use error::{BackendError, ControllerError, ControllerResult};
pub use form::{EditContext, Modal, OrderForm, StatusSelector};
pub use http_backend::HttpOrderBackend;
pub use table::{Column, OrderRow, OrderTable};

const REMOVE_CONFIRMATION: &str = "Are you sure you want to remove this order from the view?";
const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this order?";

#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<AckResponse, BackendError>;
    async fn update_order(
        &self,
        order_id: OrderId,
        request: &UpdateOrderRequest,
    ) -> Result<AckResponse, BackendError>;
    /// Marks the order removed without deleting it.
    async fn remove_order(&self, order_id: OrderId) -> Result<AckResponse, BackendError>;
    /// Permanently deletes the order.
    async fn delete_order(&self, order_id: OrderId) -> Result<(), BackendError>;
    /// JSON listing of non-removed orders. Not served by the HTML-only order
    /// management page; backends must expose it separately.
    async fn list_orders(&self, sort: SortKey) -> Result<Vec<OrderRecord>, BackendError>;
}

/// Interactive yes/no guard in front of irreversible actions.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Answers every confirmation the same way.
pub struct FixedConfirm(pub bool);

#[async_trait]
impl ConfirmPrompt for FixedConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Blocking user-facing message.
    Alert(String),
    TableLoaded { rows: usize },
    RowUpdated(OrderId),
    RowHidden(OrderId),
    RowShown(OrderId),
    RowRemoved(OrderId),
    ModalOpened(Option<OrderId>),
    ModalClosed,
}

struct TableState {
    table: OrderTable,
    sort: SortKey,
}

/// Drives the orders table and its edit modal against an `OrderBackend`.
///
/// Table and modal locks are never held across a backend call.
pub struct OrderRowController {
    backend: Arc<dyn OrderBackend>,
    prompt: Arc<dyn ConfirmPrompt>,
    table: Mutex<TableState>,
    modal: Mutex<Modal>,
    events: broadcast::Sender<ControllerEvent>,
}

impl OrderRowController {
    pub fn new(backend: Arc<dyn OrderBackend>, prompt: Arc<dyn ConfirmPrompt>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            backend,
            prompt,
            table: Mutex::new(TableState {
                table: OrderTable::default(),
                sort: SortKey::default(),
            }),
            modal: Mutex::new(Modal::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn table_snapshot(&self) -> OrderTable {
        self.table.lock().await.table.clone()
    }

    pub async fn modal_snapshot(&self) -> Modal {
        self.modal.lock().await.clone()
    }

    pub async fn sort_key(&self) -> SortKey {
        self.table.lock().await.sort
    }

    /// Installs rows rendered by the server and normalizes their status labels.
    pub async fn load_rows(&self, rows: Vec<OrderRow>) {
        let count = {
            let mut guard = self.table.lock().await;
            guard.table.replace_rows(rows);
            guard.table.normalize_status_labels();
            guard.table.len()
        };
        self.emit(ControllerEvent::TableLoaded { rows: count });
    }

    pub async fn refresh_table(&self, sort: SortKey) -> ControllerResult<usize> {
        let records = match self.backend.list_orders(sort).await {
            Ok(records) => records,
            Err(err) => {
                error!(%err, sort_by = sort.as_str(), "failed to load orders");
                self.alert("An error occurred while loading orders.");
                return Err(err.into());
            }
        };

        let count = {
            let mut guard = self.table.lock().await;
            guard.table = OrderTable::from_records(&records);
            guard.table.normalize_status_labels();
            guard.sort = sort;
            guard.table.len()
        };
        info!(rows = count, sort_by = sort.as_str(), "orders table loaded");
        self.emit(ControllerEvent::TableLoaded { rows: count });
        Ok(count)
    }

    pub async fn normalize_status_labels(&self) -> usize {
        self.table.lock().await.table.normalize_status_labels()
    }

    pub async fn sort_table(&self, sort: SortKey) {
        let mut guard = self.table.lock().await;
        guard.table.sort(sort);
        guard.sort = sort;
    }

    /// Copies the row's cells into the form and binds the modal to that row.
    /// Fails with `NotFound` when the status cell matches no selector option,
    /// so an untouched save never rewrites the status.
    pub async fn open_editor(&self, order_id: OrderId) -> ControllerResult<EditContext> {
        let (original, fields, status) = {
            let guard = self.table.lock().await;
            let row = guard.table.require_row(order_id).map_err(missing)?;
            let fields = row.read_fields().map_err(missing)?;
            let status = row.status().map_err(missing)?.ok_or_else(|| {
                missing(ControllerError::NotFound(format!(
                    "status option for order {order_id}"
                )))
            })?;
            (row.clone(), fields, status)
        };

        let mut form = OrderForm {
            fields,
            ..OrderForm::default()
        };
        form.status.select(status);

        let context = EditContext { order_id, original };
        self.modal.lock().await.open_for_edit(context.clone(), form);
        self.emit(ControllerEvent::ModalOpened(Some(order_id)));
        Ok(context)
    }

    /// Clears the form and opens the modal for a new order.
    pub async fn open_creator(&self) {
        self.modal.lock().await.open_for_create();
        self.emit(ControllerEvent::ModalOpened(None));
    }

    pub async fn close_modal(&self) {
        self.modal.lock().await.close();
        self.emit(ControllerEvent::ModalClosed);
    }

    /// Applies user input to the open form.
    pub async fn edit_form(&self, edit: impl FnOnce(&mut OrderForm) + Send) {
        edit(self.modal.lock().await.form_mut());
    }

    /// Sends the open form as an update of the order the modal is bound to.
    ///
    /// The edit context is captured before the request goes out, so the
    /// acknowledgment always lands on the row that was being edited.
    pub async fn submit_edit(&self) -> ControllerResult<()> {
        let (order_id, request) = {
            let modal = self.modal.lock().await;
            let order_id = modal.editing().ok_or_else(|| {
                warn!("save requested without an open edit context");
                ControllerError::NoActiveEdit
            })?;
            (order_id, modal.form().update_request())
        };
        info!(order_id = order_id.0, status = %request.status, "submitting order update");

        let ack = match self.backend.update_order(order_id, &request).await {
            Ok(ack) => ack,
            Err(err) => {
                error!(order_id = order_id.0, %err, "order update failed");
                self.alert("An error occurred while updating the order.");
                return Err(err.into());
            }
        };
        if !ack.success {
            let message = ack.message.unwrap_or_default();
            warn!(order_id = order_id.0, %message, "order update rejected");
            self.alert("Failed to update order.");
            return Err(ControllerError::Rejected(message));
        }

        let acknowledged = ack.order.unwrap_or(request);
        {
            let mut guard = self.table.lock().await;
            match guard.table.apply_update(order_id, &acknowledged) {
                Ok(()) => {
                    let sort = guard.sort;
                    guard.table.sort(sort);
                }
                Err(err) => warn!(order_id = order_id.0, %err, "acknowledged row is gone"),
            }
        }

        let closed = {
            let mut modal = self.modal.lock().await;
            let still_editing = modal.editing() == Some(order_id);
            if still_editing {
                modal.close();
            }
            still_editing
        };
        self.emit(ControllerEvent::RowUpdated(order_id));
        if closed {
            self.emit(ControllerEvent::ModalClosed);
        }
        Ok(())
    }

    /// Sends the form's text fields as a new order; the server picks the status.
    pub async fn create_order(&self) -> ControllerResult<()> {
        let request = self.modal.lock().await.form().fields.clone();
        info!(customer = %request.customer_name, "creating order");

        let ack = match self.backend.create_order(&request).await {
            Ok(ack) => ack,
            Err(err) => {
                error!(%err, "order creation failed");
                self.alert("An error occurred while creating the order.");
                return Err(err.into());
            }
        };
        if !ack.success {
            let message = ack.message.unwrap_or_default();
            warn!(%message, "order creation rejected");
            self.alert("Error creating order");
            return Err(ControllerError::Rejected(message));
        }

        self.alert("Order created successfully");
        self.close_modal().await;

        let sort = self.sort_key().await;
        if let Err(err) = self.refresh_table(sort).await {
            warn!(%err, "created order is not shown until the next refresh");
        }
        Ok(())
    }

    /// Hides the row right away, then marks the order removed on the server.
    /// The row comes back if the server does not confirm.
    pub async fn soft_remove_order(&self, order_id: OrderId) -> ControllerResult<()> {
        self.ensure_row(order_id).await?;
        if !self.prompt.confirm(REMOVE_CONFIRMATION).await {
            return Err(ControllerError::Cancelled);
        }

        self.table
            .lock()
            .await
            .table
            .set_visible(order_id, false)
            .map_err(missing)?;
        self.emit(ControllerEvent::RowHidden(order_id));

        let failure = match self.backend.remove_order(order_id).await {
            Ok(ack) if ack.success => {
                info!(order_id = order_id.0, "order marked as removed");
                return Ok(());
            }
            Ok(ack) => ControllerError::Rejected(ack.message.unwrap_or_default()),
            Err(err) => err.into(),
        };

        warn!(order_id = order_id.0, err = %failure, "soft remove failed; showing row again");
        if let Err(err) = self.table.lock().await.table.set_visible(order_id, true) {
            warn!(order_id = order_id.0, %err, "could not restore hidden row");
        } else {
            self.emit(ControllerEvent::RowShown(order_id));
        }
        self.alert("Failed to mark order as removed.");
        Err(failure)
    }

    /// Deletes the order on the server and drops the row once it confirms.
    pub async fn hard_delete_order(&self, order_id: OrderId) -> ControllerResult<()> {
        self.ensure_row(order_id).await?;
        if !self.prompt.confirm(DELETE_CONFIRMATION).await {
            return Err(ControllerError::Cancelled);
        }

        if let Err(err) = self.backend.delete_order(order_id).await {
            error!(order_id = order_id.0, %err, "order delete failed");
            self.alert("Failed to delete order.");
            return Err(err.into());
        }

        if let Err(err) = self.table.lock().await.table.remove(order_id) {
            warn!(order_id = order_id.0, %err, "deleted row was already gone");
        }
        info!(order_id = order_id.0, "order deleted");
        self.emit(ControllerEvent::RowRemoved(order_id));
        Ok(())
    }

    /// Reports the row's status back to the user. Nothing is sent.
    pub async fn change_order_status_only(
        &self,
        order_id: OrderId,
    ) -> ControllerResult<OrderStatus> {
        let status = {
            let guard = self.table.lock().await;
            let row = guard.table.require_row(order_id).map_err(missing)?;
            row.status().map_err(missing)?
        }
        .ok_or_else(|| {
            missing(ControllerError::NotFound(format!(
                "status option for order {order_id}"
            )))
        })?;

        self.alert(&format!("Order status changed to: {status}"));
        Ok(status)
    }

    async fn ensure_row(&self, order_id: OrderId) -> ControllerResult<()> {
        self.table
            .lock()
            .await
            .table
            .require_row(order_id)
            .map(|_| ())
            .map_err(missing)
    }

    fn alert(&self, message: &str) {
        info!(%message, "alerting user");
        self.emit(ControllerEvent::Alert(message.to_string()));
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}

fn missing(err: ControllerError) -> ControllerError {
    warn!(%err, "expected element is missing");
    err
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
