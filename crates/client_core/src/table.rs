//! In-memory model of the rendered orders table.
//!
//! Each row caches the last acknowledged server state of one order as display
//! text, one string per column.

use std::{cmp::Reverse, collections::HashMap};

use chrono::NaiveDate;
use shared::{
    domain::{DelicacyType, OrderId, OrderStatus, SortKey},
    protocol::{OrderFields, OrderRecord, UpdateOrderRequest},
};

use crate::error::{ControllerError, ControllerResult};

pub const PICKUP_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    CustomerName,
    ContactNumber,
    Address,
    PickupPlace,
    PickupDate,
    Delicacy,
    Quantity,
    Container,
    SpecialRequest,
    Status,
}

impl Column {
    pub const COUNT: usize = 10;

    pub const ALL: [Column; Column::COUNT] = [
        Column::CustomerName,
        Column::ContactNumber,
        Column::Address,
        Column::PickupPlace,
        Column::PickupDate,
        Column::Delicacy,
        Column::Quantity,
        Column::Container,
        Column::SpecialRequest,
        Column::Status,
    ];

    /// Free-text columns, in display order.
    pub const TEXT: [Column; 9] = [
        Column::CustomerName,
        Column::ContactNumber,
        Column::Address,
        Column::PickupPlace,
        Column::PickupDate,
        Column::Delicacy,
        Column::Quantity,
        Column::Container,
        Column::SpecialRequest,
    ];

    pub fn index(self) -> usize {
        match self {
            Column::CustomerName => 0,
            Column::ContactNumber => 1,
            Column::Address => 2,
            Column::PickupPlace => 3,
            Column::PickupDate => 4,
            Column::Delicacy => 5,
            Column::Quantity => 6,
            Column::Container => 7,
            Column::SpecialRequest => 8,
            Column::Status => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Column::CustomerName => "customer_name",
            Column::ContactNumber => "contact_number",
            Column::Address => "address",
            Column::PickupPlace => "pickup_place",
            Column::PickupDate => "pickup_date",
            Column::Delicacy => "delicacy",
            Column::Quantity => "quantity",
            Column::Container => "container",
            Column::SpecialRequest => "special_request",
            Column::Status => "status",
        }
    }
}

/// Label shown for a raw status value, if the value is known.
pub fn status_label_for(raw: &str) -> Option<&'static str> {
    OrderStatus::from_raw(raw).map(OrderStatus::label)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    order_id: OrderId,
    cells: Vec<String>,
    visible: bool,
}

impl OrderRow {
    pub fn new(order_id: OrderId, cells: Vec<String>) -> Self {
        Self {
            order_id,
            cells,
            visible: true,
        }
    }

    pub fn from_record(record: &OrderRecord) -> Self {
        let mut cells: Vec<String> = record
            .fields
            .to_cells()
            .iter()
            .map(|cell| cell.to_string())
            .collect();
        cells.push(record.status.as_str().to_string());
        Self::new(record.id, cells)
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn element_id(&self) -> String {
        row_element_id(self.order_id)
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn cell(&self, column: Column) -> ControllerResult<&str> {
        self.cells
            .get(column.index())
            .map(String::as_str)
            .ok_or_else(|| {
                ControllerError::NotFound(format!(
                    "{} cell of row {}",
                    column.name(),
                    self.element_id()
                ))
            })
    }

    fn set_cell(&mut self, column: Column, text: impl Into<String>) -> ControllerResult<()> {
        let element_id = self.element_id();
        let cell = self.cells.get_mut(column.index()).ok_or_else(|| {
            ControllerError::NotFound(format!("{} cell of row {element_id}", column.name()))
        })?;
        *cell = text.into();
        Ok(())
    }

    /// Reads the nine text cells. Fails on the first absent cell.
    pub fn read_fields(&self) -> ControllerResult<OrderFields> {
        Ok(OrderFields {
            customer_name: self.cell(Column::CustomerName)?.to_string(),
            contact_number: self.cell(Column::ContactNumber)?.to_string(),
            address: self.cell(Column::Address)?.to_string(),
            pickup_place: self.cell(Column::PickupPlace)?.to_string(),
            pickup_date: self.cell(Column::PickupDate)?.to_string(),
            delicacy: self.cell(Column::Delicacy)?.to_string(),
            quantity: self.cell(Column::Quantity)?.to_string(),
            container: self.cell(Column::Container)?.to_string(),
            special_request: self.cell(Column::SpecialRequest)?.to_string(),
        })
    }

    pub fn status(&self) -> ControllerResult<Option<OrderStatus>> {
        Ok(OrderStatus::from_cell_text(self.cell(Column::Status)?))
    }

    /// Rewrites every cell from an acknowledged update. The status cell shows
    /// the label, matching a normalized table.
    pub fn apply_update(&mut self, update: &UpdateOrderRequest) -> ControllerResult<()> {
        for (column, text) in Column::TEXT.into_iter().zip(update.fields.to_cells()) {
            self.set_cell(column, text)?;
        }
        self.set_cell(Column::Status, update.status.label())
    }

    fn normalize_status_label(&mut self) -> bool {
        let Some(cell) = self.cells.get_mut(Column::Status.index()) else {
            return false;
        };
        match status_label_for(cell) {
            Some(label) if cell != label => {
                *cell = label.to_string();
                true
            }
            _ => false,
        }
    }

    fn text_or_empty(&self, column: Column) -> &str {
        self.cell(column).unwrap_or_default()
    }
}

pub fn row_element_id(order_id: OrderId) -> String {
    format!("order_{}", order_id.0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderTable {
    rows: Vec<OrderRow>,
}

impl OrderTable {
    pub fn new(rows: Vec<OrderRow>) -> Self {
        Self { rows }
    }

    pub fn from_records(records: &[OrderRecord]) -> Self {
        Self::new(records.iter().map(OrderRow::from_record).collect())
    }

    pub fn rows(&self) -> &[OrderRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &OrderRow> {
        self.rows.iter().filter(|row| row.visible)
    }

    pub fn row(&self, order_id: OrderId) -> Option<&OrderRow> {
        self.rows.iter().find(|row| row.order_id == order_id)
    }

    pub fn require_row(&self, order_id: OrderId) -> ControllerResult<&OrderRow> {
        self.row(order_id)
            .ok_or_else(|| ControllerError::NotFound(format!("row {}", row_element_id(order_id))))
    }

    fn require_row_mut(&mut self, order_id: OrderId) -> ControllerResult<&mut OrderRow> {
        self.rows
            .iter_mut()
            .find(|row| row.order_id == order_id)
            .ok_or_else(|| ControllerError::NotFound(format!("row {}", row_element_id(order_id))))
    }

    pub fn replace_rows(&mut self, rows: Vec<OrderRow>) {
        self.rows = rows;
    }

    pub fn set_visible(&mut self, order_id: OrderId, visible: bool) -> ControllerResult<()> {
        self.require_row_mut(order_id)?.visible = visible;
        Ok(())
    }

    pub fn remove(&mut self, order_id: OrderId) -> ControllerResult<OrderRow> {
        let index = self
            .rows
            .iter()
            .position(|row| row.order_id == order_id)
            .ok_or_else(|| ControllerError::NotFound(format!("row {}", row_element_id(order_id))))?;
        Ok(self.rows.remove(index))
    }

    pub fn apply_update(
        &mut self,
        order_id: OrderId,
        update: &UpdateOrderRequest,
    ) -> ControllerResult<()> {
        self.require_row_mut(order_id)?.apply_update(update)
    }

    /// Replaces known raw status values with their labels. Returns how many
    /// cells changed; a second run changes nothing.
    pub fn normalize_status_labels(&mut self) -> usize {
        self.rows
            .iter_mut()
            .map(OrderRow::normalize_status_label)
            .filter(|changed| *changed)
            .count()
    }

    /// Stable sort matching the order management view.
    pub fn sort(&mut self, key: SortKey) {
        match key {
            SortKey::PickupDate => {
                self.rows.sort_by_key(|row| {
                    let date = NaiveDate::parse_from_str(
                        row.text_or_empty(Column::PickupDate).trim(),
                        PICKUP_DATE_FORMAT,
                    )
                    .ok();
                    (date.is_none(), date)
                });
            }
            SortKey::Delicacy => {
                let mut counts: HashMap<String, usize> = HashMap::new();
                for row in &self.rows {
                    *counts.entry(delicacy_key(row)).or_default() += 1;
                }
                self.rows.sort_by_key(|row| {
                    Reverse(counts.get(&delicacy_key(row)).copied().unwrap_or(0))
                });
            }
            SortKey::Status => {
                self.rows.sort_by_key(|row| {
                    let status = row.status().ok().flatten().map(OrderStatus::as_str);
                    (status.is_none(), status)
                });
            }
        }
    }
}

fn delicacy_key(row: &OrderRow) -> String {
    let text = row.text_or_empty(Column::Delicacy);
    DelicacyType::parse_loose(text)
        .map(|delicacy| delicacy.as_str().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
