use anyhow::Result;

use crate::store::Store;
use crate::types::{Focus, Purpose};
use crate::validate::FormState;

pub const PURPOSE_GUIDANCE: &str =
    "Hey there! Please choose whether you're buying or selling (above) before entering details.";

/// The buy/sell choice that gates the whole form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    purpose: Purpose,
}

impl Selection {
    pub fn load(store: &Store) -> Self {
        Self {
            purpose: store.purpose(),
        }
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Switching purpose always starts the form over, even when the same
    /// option is picked again. In-memory state changes even if persisting
    /// fails; the error is returned for the caller to report.
    pub fn set_purpose(
        &mut self,
        value: Purpose,
        store: &Store,
        form: &mut FormState,
    ) -> Result<()> {
        tracing::debug!("updating purpose to {:?}", value);
        self.purpose = value;
        form.clear();
        store.set_purpose(value)
    }

    /// Decides where focus actually lands. Fields refuse focus while no
    /// purpose is chosen; the refusal leaves a guidance message on the field.
    pub fn gate_focus(&self, target: Focus, form: &mut FormState) -> Focus {
        match target {
            Focus::Field(field) if !self.purpose.is_set() => {
                if form.attach_guidance(field, PURPOSE_GUIDANCE) {
                    tracing::debug!("purpose not selected, guiding user on {}", field.name());
                }
                Focus::Purpose
            }
            other => other,
        }
    }
}
