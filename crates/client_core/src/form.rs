//! The shared edit modal: form fields, status selector and the edit context
//! the modal is currently bound to.

use shared::{
    domain::{OrderId, OrderStatus},
    protocol::{OrderFields, UpdateOrderRequest},
};

use crate::table::OrderRow;

/// Drop-down of status options. Like a browser `<select>`, the first option
/// is selected until something else is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSelector {
    options: Vec<OrderStatus>,
    selected: OrderStatus,
}

impl Default for StatusSelector {
    fn default() -> Self {
        Self {
            options: OrderStatus::ALL.to_vec(),
            selected: OrderStatus::ALL[0],
        }
    }
}

impl StatusSelector {
    pub fn options(&self) -> &[OrderStatus] {
        &self.options
    }

    pub fn value(&self) -> OrderStatus {
        self.selected
    }

    /// Selects the option whose value equals `value`. Leaves the selection
    /// alone when no option matches.
    pub fn select_value(&mut self, value: &str) -> bool {
        match self.options.iter().find(|option| option.as_str() == value) {
            Some(option) => {
                self.selected = *option;
                true
            }
            None => false,
        }
    }

    pub fn select(&mut self, status: OrderStatus) -> bool {
        self.select_value(status.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderForm {
    pub fields: OrderFields,
    pub status: StatusSelector,
}

impl OrderForm {
    pub fn update_request(&self) -> UpdateOrderRequest {
        UpdateOrderRequest {
            fields: self.fields.clone(),
            status: self.status.value(),
        }
    }
}

/// Which order the modal is editing, with the row as it looked when opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditContext {
    pub order_id: OrderId,
    pub original: OrderRow,
}

#[derive(Debug, Clone, Default)]
pub struct Modal {
    visible: bool,
    form: OrderForm,
    context: Option<EditContext>,
}

impl Modal {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn form(&self) -> &OrderForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut OrderForm {
        &mut self.form
    }

    pub fn context(&self) -> Option<&EditContext> {
        self.context.as_ref()
    }

    pub fn editing(&self) -> Option<OrderId> {
        self.context.as_ref().map(|context| context.order_id)
    }

    /// Binds the modal to `context`, replacing whatever edit was open.
    pub fn open_for_edit(&mut self, context: EditContext, form: OrderForm) {
        self.form = form;
        self.context = Some(context);
        self.visible = true;
    }

    pub fn open_for_create(&mut self) {
        self.form = OrderForm::default();
        self.context = None;
        self.visible = true;
    }

    pub fn close(&mut self) {
        self.visible = false;
        self.context = None;
    }
}
