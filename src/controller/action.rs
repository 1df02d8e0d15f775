// Pane actions: the closed vocabulary the command layer can request.

use serde::Deserialize;

use crate::error::PaneError;
use crate::pane::{Orientation, PaneId};

/// A pane-management request, applied to a leaf by `PaneController::handle_action`.
#[derive(Debug, Clone, PartialEq)]
pub enum PaneAction {
    /// Split a leaf. Unset fields fall back to the configured defaults;
    /// `target` overrides the leaf the action was addressed to.
    Split {
        orientation: Option<Orientation>,
        target: Option<PaneId>,
        widget_type: Option<String>,
    },
    /// Close the leaf.
    Close,
    /// Swap the leaf's widget type.
    ChangeType { new_type: String },
    /// Make the leaf active.
    Focus,
}

impl PaneAction {
    pub fn split(orientation: Orientation) -> Self {
        PaneAction::Split {
            orientation: Some(orientation),
            target: None,
            widget_type: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaneAction::Split { .. } => "split",
            PaneAction::Close => "close",
            PaneAction::ChangeType { .. } => "change_type",
            PaneAction::Focus => "focus",
        }
    }
}

/// Wire form of an action: `{"action": "split", "params": {"orientation": "vertical"}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub params: ActionParams,
}

/// Optional parameters accompanying an [`ActionRequest`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActionParams {
    pub leaf_id: Option<PaneId>,
    pub orientation: Option<Orientation>,
    pub new_type: Option<String>,
}

impl ActionRequest {
    pub fn from_json(json: &str) -> Result<Self, PaneError> {
        serde_json::from_str(json).map_err(|e| PaneError::InvalidAction(e.to_string()))
    }

    /// Resolve into the addressed leaf (if any) and a typed action.
    ///
    /// For `split`, `new_type` names the widget type of the new leaf.
    pub fn into_action(self) -> Result<(Option<PaneId>, PaneAction), PaneError> {
        let ActionParams {
            leaf_id,
            orientation,
            new_type,
        } = self.params;
        let action = match self.action.as_str() {
            "split" => PaneAction::Split {
                orientation,
                target: None,
                widget_type: new_type,
            },
            "close" => PaneAction::Close,
            "change_type" => PaneAction::ChangeType {
                new_type: new_type.ok_or_else(|| {
                    PaneError::InvalidAction("change_type requires new_type".to_string())
                })?,
            },
            "focus" => PaneAction::Focus,
            other => return Err(PaneError::InvalidAction(format!("unknown action '{other}'"))),
        };
        Ok((leaf_id, action))
    }
}
