//! Modal dialogs.
//!
//! Opening or closing a dialog applies the open/close patch and then tells
//! the rest of the page through `dialog:open` / `dialog:close`.

use crate::events::{EventBus, ThemeEvent};
use crate::render::{Patch, RenderError, SharedSink, Target, apply_shared};

/// Id of the cart drawer dialog.
pub const CART_DRAWER: &str = "cart-drawer";

/// Opens and closes dialogs on a page.
#[derive(Clone)]
pub struct Dialogs {
    sink: SharedSink,
    bus: EventBus,
}

impl Dialogs {
    #[must_use]
    pub fn new(sink: SharedSink, bus: EventBus) -> Self {
        Self { sink, bus }
    }

    /// Show `dialog_id` modally; `trigger` names the element that opened it.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingTarget` when the dialog is not on the page;
    /// no event is emitted in that case.
    pub fn open(&self, dialog_id: &str, trigger: Option<&str>) -> Result<(), RenderError> {
        apply_shared(
            &self.sink,
            &[Patch::OpenDialog {
                target: Target::dialog(dialog_id),
            }],
        )?;
        self.bus.publish(ThemeEvent::DialogOpen {
            dialog_id: dialog_id.to_string(),
            trigger: trigger.map(str::to_string),
        });
        Ok(())
    }

    /// Close `dialog_id`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingTarget` when the dialog is not on the page.
    pub fn close(&self, dialog_id: &str) -> Result<(), RenderError> {
        apply_shared(
            &self.sink,
            &[Patch::CloseDialog {
                target: Target::dialog(dialog_id),
            }],
        )?;
        self.bus.publish(ThemeEvent::DialogClose {
            dialog_id: dialog_id.to_string(),
        });
        Ok(())
    }
}
