// Error taxonomy shared by the pane tree and its controller.

use crate::pane::PaneId;

/// Errors produced by pane-tree and controller operations.
///
/// Tree mutations themselves report failure through `Option`/`bool`; these
/// variants are used where a reason has to travel further (controller
/// dispatch, state restore, wire parsing).
#[derive(Debug, thiserror::Error)]
pub enum PaneError {
    #[error("no leaf with id {0}")]
    LeafNotFound(PaneId),

    #[error("leaf {0} is already at the maximum split depth")]
    SplitTooDeep(PaneId),

    #[error("unsupported widget type '{0}'")]
    InvalidWidgetType(String),

    #[error("malformed pane state: {0}")]
    MalformedState(String),

    #[error("invalid action request: {0}")]
    InvalidAction(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaneError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_not_found_display_names_the_id() {
        let err = PaneError::LeafNotFound(PaneId::from("pane-7"));
        assert_eq!(format!("{err}"), "no leaf with id pane-7");
    }

    #[test]
    fn malformed_constructor_wraps_message() {
        let err = PaneError::malformed("split missing child");
        assert!(matches!(err, PaneError::MalformedState(ref m) if m == "split missing child"));
        assert!(format!("{err}").contains("split missing child"));
    }

    #[test]
    fn json_error_converts_via_from() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PaneError = parse.into();
        assert!(matches!(err, PaneError::Json(_)));
    }
}
