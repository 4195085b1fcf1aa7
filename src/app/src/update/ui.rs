use crux_core::Command;

use crate::events::{Event, UiEvent};
use crate::model::Model;
use crate::update_field;
use crate::Effect;

/// Handle UI-related events (clear messages, etc.)
pub fn handle(event: UiEvent, model: &mut Model) -> Command<Effect, Event> {
    match event {
        UiEvent::ClearError => update_field!(model.error_message, None),
        UiEvent::ClearSuccess => update_field!(model.success_message, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_success_removes_message() {
        let mut model = Model {
            success_message: Some("Network settings saved".to_string()),
            ..Default::default()
        };

        let _ = handle(UiEvent::ClearSuccess, &mut model);

        assert_eq!(model.success_message, None);
    }

    #[test]
    fn clear_error_keeps_success_message() {
        let mut model = Model {
            error_message: Some("boom".to_string()),
            success_message: Some("ok".to_string()),
            ..Default::default()
        };

        let _ = handle(UiEvent::ClearError, &mut model);

        assert_eq!(model.error_message, None);
        assert_eq!(model.success_message.as_deref(), Some("ok"));
    }
}
