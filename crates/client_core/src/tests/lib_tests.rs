use super::*;
use shared::protocol::OrderFields;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Accept,
    Reject,
    Fail,
}

struct ScriptedBackend {
    outcome: Outcome,
    echo_order: bool,
    listed: Mutex<Vec<OrderRecord>>,
    updates: Mutex<Vec<(OrderId, UpdateOrderRequest)>>,
    creates: Mutex<Vec<CreateOrderRequest>>,
    removes: Mutex<Vec<OrderId>>,
    deletes: Mutex<Vec<OrderId>>,
    gates: Mutex<HashMap<OrderId, oneshot::Receiver<()>>>,
    arrivals: Option<mpsc::UnboundedSender<OrderId>>,
}

impl ScriptedBackend {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            echo_order: true,
            listed: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
            removes: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            arrivals: None,
        }
    }

    fn accepting() -> Self {
        Self::new(Outcome::Accept)
    }

    fn without_echo(mut self) -> Self {
        self.echo_order = false;
        self
    }

    fn with_listed(self, records: Vec<OrderRecord>) -> Self {
        *self.listed.try_lock().expect("fresh lock") = records;
        self
    }

    /// Holds update requests for the gated orders until the sender fires and
    /// reports each update as it arrives.
    fn gated(
        mut self,
        order_ids: &[OrderId],
    ) -> (
        Self,
        HashMap<OrderId, oneshot::Sender<()>>,
        mpsc::UnboundedReceiver<OrderId>,
    ) {
        let mut releases = HashMap::new();
        {
            let mut gates = self.gates.try_lock().expect("fresh lock");
            for order_id in order_ids {
                let (tx, rx) = oneshot::channel();
                gates.insert(*order_id, rx);
                releases.insert(*order_id, tx);
            }
        }
        let (arrivals_tx, arrivals_rx) = mpsc::unbounded_channel();
        self.arrivals = Some(arrivals_tx);
        (self, releases, arrivals_rx)
    }

    fn failure(&self) -> BackendError {
        BackendError::Status {
            status: 500,
            message: "database is locked".into(),
        }
    }
}

#[async_trait]
impl OrderBackend for ScriptedBackend {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<AckResponse, BackendError> {
        self.creates.lock().await.push(request.clone());
        match self.outcome {
            Outcome::Accept => {
                let mut listed = self.listed.lock().await;
                let next_id = listed.iter().map(|r| r.id.0).max().unwrap_or(0) + 1;
                listed.push(OrderRecord {
                    id: OrderId(next_id),
                    fields: request.clone(),
                    status: OrderStatus::Pending,
                });
                Ok(AckResponse::ok())
            }
            Outcome::Reject => Ok(AckResponse::rejected("invalid delicacy")),
            Outcome::Fail => Err(self.failure()),
        }
    }

    async fn update_order(
        &self,
        order_id: OrderId,
        request: &UpdateOrderRequest,
    ) -> Result<AckResponse, BackendError> {
        self.updates.lock().await.push((order_id, request.clone()));
        if let Some(arrivals) = &self.arrivals {
            let _ = arrivals.send(order_id);
        }
        let gate = self.gates.lock().await.remove(&order_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.outcome {
            Outcome::Accept => Ok(AckResponse {
                success: true,
                order: self.echo_order.then(|| request.clone()),
                message: None,
            }),
            Outcome::Reject => Ok(AckResponse::rejected("Order not found")),
            Outcome::Fail => Err(self.failure()),
        }
    }

    async fn remove_order(&self, order_id: OrderId) -> Result<AckResponse, BackendError> {
        self.removes.lock().await.push(order_id);
        match self.outcome {
            Outcome::Accept => Ok(AckResponse::ok()),
            Outcome::Reject => Ok(AckResponse::rejected("not removable")),
            Outcome::Fail => Err(self.failure()),
        }
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), BackendError> {
        self.deletes.lock().await.push(order_id);
        match self.outcome {
            Outcome::Accept => Ok(()),
            Outcome::Reject | Outcome::Fail => Err(self.failure()),
        }
    }

    async fn list_orders(&self, _sort: SortKey) -> Result<Vec<OrderRecord>, BackendError> {
        match self.outcome {
            Outcome::Fail => Err(self.failure()),
            _ => Ok(self.listed.lock().await.clone()),
        }
    }
}

/// Records every confirmation message and answers with a fixed choice.
struct RecordingConfirm {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ConfirmPrompt for RecordingConfirm {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.lock().await.push(message.to_string());
        self.answer
    }
}

fn sample_row(id: i64, name: &str, status: &str) -> OrderRow {
    OrderRow::new(
        OrderId(id),
        [
            name,
            "0917-555-0101",
            "12 Mabini St",
            "Main Store",
            "2024-06-01",
            "PUTO",
            "2",
            "BILAO_12",
            "extra cheese",
            status,
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    )
}

async fn controller_with(
    backend: ScriptedBackend,
    confirm: bool,
) -> (Arc<OrderRowController>, Arc<ScriptedBackend>) {
    let backend = Arc::new(backend);
    let controller = OrderRowController::new(backend.clone(), Arc::new(FixedConfirm(confirm)));
    controller
        .load_rows(vec![
            sample_row(1, "Ana Cruz", "OrderStatus.PENDING"),
            sample_row(7, "Ben Reyes", "OrderStatus.IN_PROGRESS"),
        ])
        .await;
    (controller, backend)
}

fn drain_alerts(events: &mut broadcast::Receiver<ControllerEvent>) -> Vec<String> {
    let mut alerts = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ControllerEvent::Alert(message) = event {
            alerts.push(message);
        }
    }
    alerts
}

#[tokio::test]
async fn load_rows_normalizes_status_labels() {
    let (controller, _backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let table = controller.table_snapshot().await;
    let statuses: Vec<&str> = table
        .rows()
        .iter()
        .map(|row| row.cell(Column::Status).expect("status"))
        .collect();
    assert_eq!(statuses, ["Pending", "In Progress"]);
    assert_eq!(controller.normalize_status_labels().await, 0);
}

#[tokio::test]
async fn open_editor_selects_status_from_namespaced_cell() {
    let backend = Arc::new(ScriptedBackend::accepting());
    let controller = OrderRowController::new(backend, Arc::new(FixedConfirm(true)));
    controller
        .load_rows(vec![sample_row(7, "Ben Reyes", "OrderStatus.IN_PROGRESS")])
        .await;

    let context = controller.open_editor(OrderId(7)).await.expect("open");
    assert_eq!(context.order_id, OrderId(7));

    let modal = controller.modal_snapshot().await;
    assert!(modal.is_visible());
    assert_eq!(modal.editing(), Some(OrderId(7)));
    assert_eq!(modal.form().status.value().as_str(), "IN_PROGRESS");
    assert_eq!(modal.form().fields.customer_name, "Ben Reyes");
}

#[tokio::test]
async fn open_editor_for_missing_row_is_not_found_and_leaves_modal_closed() {
    let (controller, _backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let err = controller
        .open_editor(OrderId(42))
        .await
        .expect_err("row is absent");
    assert!(matches!(err, ControllerError::NotFound(ref what) if what.contains("order_42")));
    assert!(!controller.modal_snapshot().await.is_visible());
}

#[tokio::test]
async fn open_editor_with_missing_cell_is_not_found() {
    let backend = Arc::new(ScriptedBackend::accepting());
    let controller = OrderRowController::new(backend, Arc::new(FixedConfirm(true)));
    controller
        .load_rows(vec![OrderRow::new(
            OrderId(3),
            vec!["Ana".to_string(), "0917".to_string()],
        )])
        .await;

    let err = controller.open_editor(OrderId(3)).await.expect_err("short row");
    assert!(matches!(err, ControllerError::NotFound(_)));
    assert!(controller.modal_snapshot().await.editing().is_none());
}

#[tokio::test]
async fn open_editor_with_unknown_status_refuses_to_open_and_sends_nothing() {
    let backend = Arc::new(ScriptedBackend::accepting());
    let controller = OrderRowController::new(backend.clone(), Arc::new(FixedConfirm(true)));
    controller
        .load_rows(vec![sample_row(9, "Cy Lim", "OrderStatus.ON_HOLD")])
        .await;
    let before = controller.table_snapshot().await;

    let err = controller
        .open_editor(OrderId(9))
        .await
        .expect_err("status has no selector option");
    assert!(matches!(err, ControllerError::NotFound(ref what) if what.contains("status option")));

    let modal = controller.modal_snapshot().await;
    assert!(!modal.is_visible());
    assert!(modal.editing().is_none());

    let err = controller.submit_edit().await.expect_err("nothing open");
    assert!(matches!(err, ControllerError::NoActiveEdit));
    assert!(backend.updates.lock().await.is_empty());
    assert_eq!(controller.table_snapshot().await, before);
    assert_eq!(
        before
            .row(OrderId(9))
            .expect("row")
            .cell(Column::Status)
            .expect("status"),
        "OrderStatus.ON_HOLD"
    );
}

#[tokio::test]
async fn unmodified_submit_sends_row_cells_with_bare_status() {
    let (controller, backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let before = controller.table_snapshot().await;
    let row = before.row(OrderId(7)).expect("row").clone();

    controller.open_editor(OrderId(7)).await.expect("open");
    controller.submit_edit().await.expect("submit");

    let updates = backend.updates.lock().await;
    assert_eq!(updates.len(), 1);
    let (order_id, request) = &updates[0];
    assert_eq!(*order_id, OrderId(7));
    assert_eq!(request.fields, row.read_fields().expect("fields"));
    assert_eq!(request.status, OrderStatus::InProgress);
    assert_eq!(
        serde_json::to_value(request).expect("json")["status"],
        "IN_PROGRESS"
    );
    drop(updates);

    assert_eq!(controller.table_snapshot().await, before);
    assert!(!controller.modal_snapshot().await.is_visible());
}

#[tokio::test]
async fn successful_submit_patches_row_and_closes_modal() {
    let (controller, _backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let mut events = controller.subscribe_events();

    controller.open_editor(OrderId(1)).await.expect("open");
    controller
        .edit_form(|form| {
            form.fields.quantity = "12".into();
            form.status.select(OrderStatus::Completed);
        })
        .await;
    controller.submit_edit().await.expect("submit");

    let table = controller.table_snapshot().await;
    let row = table.row(OrderId(1)).expect("row");
    assert_eq!(row.cell(Column::Quantity).expect("quantity"), "12");
    assert_eq!(row.cell(Column::Status).expect("status"), "Completed");

    let modal = controller.modal_snapshot().await;
    assert!(!modal.is_visible());
    assert!(modal.context().is_none());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&ControllerEvent::RowUpdated(OrderId(1))));
    assert!(seen.contains(&ControllerEvent::ModalClosed));
}

#[tokio::test]
async fn submit_without_echoed_order_patches_from_submitted_payload() {
    let (controller, _backend) =
        controller_with(ScriptedBackend::accepting().without_echo(), true).await;

    controller.open_editor(OrderId(1)).await.expect("open");
    controller
        .edit_form(|form| form.fields.address = "7 Luna St".into())
        .await;
    controller.submit_edit().await.expect("submit");

    let table = controller.table_snapshot().await;
    assert_eq!(
        table
            .row(OrderId(1))
            .expect("row")
            .cell(Column::Address)
            .expect("address"),
        "7 Luna St"
    );
}

#[tokio::test]
async fn rejected_submit_keeps_row_modal_and_unsaved_edits() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Reject), true).await;
    let before = controller.table_snapshot().await;
    let mut events = controller.subscribe_events();

    controller.open_editor(OrderId(1)).await.expect("open");
    controller
        .edit_form(|form| form.fields.customer_name = "Ana Santos".into())
        .await;
    let err = controller.submit_edit().await.expect_err("rejected");
    assert!(matches!(err, ControllerError::Rejected(ref message) if message == "Order not found"));

    assert_eq!(controller.table_snapshot().await, before);
    let modal = controller.modal_snapshot().await;
    assert!(modal.is_visible());
    assert_eq!(modal.editing(), Some(OrderId(1)));
    assert_eq!(modal.form().fields.customer_name, "Ana Santos");
    assert_eq!(drain_alerts(&mut events), ["Failed to update order."]);
}

#[tokio::test]
async fn transport_failure_on_submit_alerts_and_keeps_modal_open() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Fail), true).await;
    let before = controller.table_snapshot().await;
    let mut events = controller.subscribe_events();

    controller.open_editor(OrderId(7)).await.expect("open");
    let err = controller.submit_edit().await.expect_err("transport");
    assert!(matches!(err, ControllerError::Transport(_)));

    assert_eq!(controller.table_snapshot().await, before);
    assert!(controller.modal_snapshot().await.is_visible());
    assert_eq!(
        drain_alerts(&mut events),
        ["An error occurred while updating the order."]
    );
}

#[tokio::test]
async fn submit_without_open_editor_fails() {
    let (controller, backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let err = controller.submit_edit().await.expect_err("nothing open");
    assert!(matches!(err, ControllerError::NoActiveEdit));
    assert!(backend.updates.lock().await.is_empty());
}

#[tokio::test]
async fn concurrent_submits_for_different_rows_do_not_cross_contaminate() {
    let (backend, mut releases, mut arrivals) =
        ScriptedBackend::accepting().gated(&[OrderId(1), OrderId(7)]);
    let (controller, _backend) = controller_with(backend, true).await;
    let before = controller.table_snapshot().await;

    controller.open_editor(OrderId(1)).await.expect("open first");
    controller
        .edit_form(|form| form.fields.customer_name = "Ana Updated".into())
        .await;
    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_edit().await })
    };
    assert_eq!(arrivals.recv().await, Some(OrderId(1)));

    controller.open_editor(OrderId(7)).await.expect("open second");
    controller
        .edit_form(|form| form.fields.pickup_place = "Night Market".into())
        .await;
    let second = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_edit().await })
    };
    assert_eq!(arrivals.recv().await, Some(OrderId(7)));

    // Resolve in reverse order of submission.
    releases
        .remove(&OrderId(7))
        .expect("gate")
        .send(())
        .expect("release second");
    second.await.expect("join").expect("second submit");
    releases
        .remove(&OrderId(1))
        .expect("gate")
        .send(())
        .expect("release first");
    first.await.expect("join").expect("first submit");

    let table = controller.table_snapshot().await;
    let first_row = table.row(OrderId(1)).expect("row 1");
    let second_row = table.row(OrderId(7)).expect("row 7");
    let first_before = before.row(OrderId(1)).expect("row 1");
    let second_before = before.row(OrderId(7)).expect("row 7");

    assert_eq!(first_row.cell(Column::CustomerName).expect("name"), "Ana Updated");
    assert_eq!(
        first_row.cell(Column::PickupPlace).expect("place"),
        first_before.cell(Column::PickupPlace).expect("place")
    );
    assert_eq!(first_row.cell(Column::Status).expect("status"), "Pending");

    assert_eq!(second_row.cell(Column::PickupPlace).expect("place"), "Night Market");
    assert_eq!(
        second_row.cell(Column::CustomerName).expect("name"),
        second_before.cell(Column::CustomerName).expect("name")
    );
    assert_eq!(second_row.cell(Column::Status).expect("status"), "In Progress");
}

#[tokio::test]
async fn create_alerts_closes_modal_and_refreshes_table() {
    let backend = ScriptedBackend::accepting().with_listed(vec![OrderRecord {
        id: OrderId(1),
        fields: sample_row(1, "Ana Cruz", "PENDING").read_fields().expect("fields"),
        status: OrderStatus::Pending,
    }]);
    let (controller, backend) = controller_with(backend, true).await;
    let mut events = controller.subscribe_events();

    controller.open_creator().await;
    controller
        .edit_form(|form| {
            form.fields = OrderFields {
                customer_name: "Carla Diaz".into(),
                contact_number: "0920".into(),
                address: "9 Bonifacio St".into(),
                pickup_place: "Main Store".into(),
                pickup_date: "2024-06-03".into(),
                delicacy: "SAPIN_SAPIN".into(),
                quantity: "1".into(),
                container: "BILAO_14".into(),
                special_request: String::new(),
            }
        })
        .await;
    controller.create_order().await.expect("create");

    assert_eq!(backend.creates.lock().await.len(), 1);
    assert!(!controller.modal_snapshot().await.is_visible());

    let table = controller.table_snapshot().await;
    assert_eq!(table.len(), 2);
    let created = table.row(OrderId(2)).expect("new row is shown");
    assert_eq!(created.cell(Column::CustomerName).expect("name"), "Carla Diaz");
    assert_eq!(created.cell(Column::Status).expect("status"), "Pending");
    assert_eq!(drain_alerts(&mut events), ["Order created successfully"]);
}

#[tokio::test]
async fn rejected_create_keeps_form_open() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Reject), true).await;
    let mut events = controller.subscribe_events();

    controller.open_creator().await;
    controller
        .edit_form(|form| form.fields.customer_name = "Dina".into())
        .await;
    let err = controller.create_order().await.expect_err("rejected");
    assert!(matches!(err, ControllerError::Rejected(_)));

    let modal = controller.modal_snapshot().await;
    assert!(modal.is_visible());
    assert_eq!(modal.form().fields.customer_name, "Dina");
    assert_eq!(controller.table_snapshot().await.len(), 2);
    assert_eq!(drain_alerts(&mut events), ["Error creating order"]);
}

#[tokio::test]
async fn hard_delete_removes_row_after_confirmation() {
    let confirm = RecordingConfirm::new(true);
    let backend = Arc::new(ScriptedBackend::accepting());
    let controller = OrderRowController::new(backend.clone(), confirm.clone());
    controller
        .load_rows(vec![sample_row(1, "Ana Cruz", "PENDING")])
        .await;

    controller
        .hard_delete_order(OrderId(1))
        .await
        .expect("delete");

    assert!(controller.table_snapshot().await.row(OrderId(1)).is_none());
    assert_eq!(*backend.deletes.lock().await, [OrderId(1)]);
    assert_eq!(
        *confirm.asked.lock().await,
        ["Are you sure you want to delete this order?"]
    );
}

#[tokio::test]
async fn failed_hard_delete_leaves_row_present_and_visible() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Fail), true).await;
    let mut events = controller.subscribe_events();

    let err = controller
        .hard_delete_order(OrderId(7))
        .await
        .expect_err("delete fails");
    assert!(matches!(err, ControllerError::Transport(_)));

    let table = controller.table_snapshot().await;
    assert!(table.row(OrderId(7)).expect("row").is_visible());
    assert_eq!(drain_alerts(&mut events), ["Failed to delete order."]);
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let (controller, backend) = controller_with(ScriptedBackend::accepting(), false).await;

    let err = controller
        .hard_delete_order(OrderId(1))
        .await
        .expect_err("declined");
    assert!(matches!(err, ControllerError::Cancelled));
    let err = controller
        .soft_remove_order(OrderId(1))
        .await
        .expect_err("declined");
    assert!(matches!(err, ControllerError::Cancelled));

    assert!(backend.deletes.lock().await.is_empty());
    assert!(backend.removes.lock().await.is_empty());
    assert!(controller
        .table_snapshot()
        .await
        .row(OrderId(1))
        .expect("row")
        .is_visible());
}

#[tokio::test]
async fn soft_remove_hides_row_on_success() {
    let (controller, backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let mut events = controller.subscribe_events();

    controller
        .soft_remove_order(OrderId(7))
        .await
        .expect("remove");

    let table = controller.table_snapshot().await;
    assert!(!table.row(OrderId(7)).expect("row stays cached").is_visible());
    assert_eq!(*backend.removes.lock().await, [OrderId(7)]);
    assert_eq!(events.try_recv().expect("event"), ControllerEvent::RowHidden(OrderId(7)));
    assert!(drain_alerts(&mut events).is_empty());
}

#[tokio::test]
async fn failed_soft_remove_shows_row_again() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Reject), true).await;
    let mut events = controller.subscribe_events();

    let err = controller
        .soft_remove_order(OrderId(7))
        .await
        .expect_err("rejected");
    assert!(matches!(err, ControllerError::Rejected(_)));

    let table = controller.table_snapshot().await;
    assert!(table.row(OrderId(7)).expect("row").is_visible());
    assert_eq!(events.try_recv().expect("hidden"), ControllerEvent::RowHidden(OrderId(7)));
    assert_eq!(events.try_recv().expect("shown"), ControllerEvent::RowShown(OrderId(7)));
    assert_eq!(drain_alerts(&mut events), ["Failed to mark order as removed."]);
}

#[tokio::test]
async fn removing_an_unknown_row_is_not_found_without_prompting() {
    let confirm = RecordingConfirm::new(true);
    let backend = Arc::new(ScriptedBackend::accepting());
    let controller = OrderRowController::new(backend.clone(), confirm.clone());

    let err = controller
        .soft_remove_order(OrderId(5))
        .await
        .expect_err("no row");
    assert!(matches!(err, ControllerError::NotFound(_)));
    assert!(confirm.asked.lock().await.is_empty());
    assert!(backend.removes.lock().await.is_empty());
}

#[tokio::test]
async fn change_status_only_alerts_without_network_call() {
    let (controller, backend) = controller_with(ScriptedBackend::accepting(), true).await;
    let mut events = controller.subscribe_events();

    let status = controller
        .change_order_status_only(OrderId(7))
        .await
        .expect("status");
    assert_eq!(status, OrderStatus::InProgress);
    assert_eq!(
        drain_alerts(&mut events),
        ["Order status changed to: IN_PROGRESS"]
    );
    assert!(backend.updates.lock().await.is_empty());
}

#[tokio::test]
async fn refresh_failure_alerts_and_keeps_current_rows() {
    let (controller, _backend) = controller_with(ScriptedBackend::new(Outcome::Fail), true).await;
    let before = controller.table_snapshot().await;
    let mut events = controller.subscribe_events();

    let err = controller
        .refresh_table(SortKey::Status)
        .await
        .expect_err("list fails");
    assert!(matches!(err, ControllerError::Transport(_)));
    assert_eq!(controller.table_snapshot().await, before);
    assert_eq!(controller.sort_key().await, SortKey::PickupDate);
    assert_eq!(
        drain_alerts(&mut events),
        ["An error occurred while loading orders."]
    );
}
