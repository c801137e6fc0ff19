//! Widget state definitions.

/// The UI state of a shape on the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    /// Normal display state - no interaction.
    #[default]
    Normal,
    /// Selected: shows transform handles.
    Selected,
    /// A handle is being dragged.
    Transforming,
}

impl WidgetState {
    /// Check if widget is selected (either just selected or transforming).
    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Selected | Self::Transforming)
    }

    pub fn is_transforming(&self) -> bool {
        matches!(self, Self::Transforming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!WidgetState::Normal.is_selected());
        assert!(WidgetState::Selected.is_selected());
        assert!(WidgetState::Transforming.is_selected());
        assert!(WidgetState::Transforming.is_transforming());
        assert_eq!(WidgetState::default(), WidgetState::Normal);
    }
}
