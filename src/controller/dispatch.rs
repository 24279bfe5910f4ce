use super::highlight::{HighlightController, HighlightError, Reveal};
use crate::document_model::{DocumentTree, PinId};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One request from the host, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    HighlightText {
        text: String,
        category: Option<String>,
    },
    HighlightAndScroll {
        text: String,
        category: Option<String>,
        flash: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    PinHighlight {
        text: String,
        category: Option<String>,
        pin_id: PinId,
    },
    RemoveHighlightByText {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveHighlights {
        include_pinned: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    UnpinHighlight {
        pin_id: PinId,
    },
    LocateText {
        text: String,
    },
}

impl Request {
    pub fn from_json(json: &str) -> Result<Self, DispatchError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn found(found: bool) -> Self {
        Self {
            found: Some(found),
            ..Self::ok()
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Runs requests against a controller one at a time, to completion.
pub struct Dispatcher<T: DocumentTree> {
    controller: HighlightController<T>,
    emphasis: bool,
    pending_reveal: Option<Reveal>,
}

impl<T: DocumentTree> Dispatcher<T> {
    pub fn new(controller: HighlightController<T>, emphasis: bool) -> Self {
        Self {
            controller,
            emphasis,
            pending_reveal: None,
        }
    }

    pub fn controller(&self) -> &HighlightController<T> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut HighlightController<T> {
        &mut self.controller
    }

    pub fn into_controller(self) -> HighlightController<T> {
        self.controller
    }

    /// The scroll request left by the last `HIGHLIGHT_AND_SCROLL`, if any.
    pub fn take_reveal(&mut self) -> Option<Reveal> {
        self.pending_reveal.take()
    }

    /// Handle one JSON request line, always producing a JSON response.
    pub fn handle_json(&mut self, json: &str) -> String {
        let response = match Request::from_json(json) {
            Ok(request) => self.handle(request),
            Err(e) => Response::failure(e.to_string()),
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"{e}"}}"#))
    }

    pub fn handle(&mut self, request: Request) -> Response {
        debug!("dispatching {request:?}");
        let ctl = &mut self.controller;

        let result = match request {
            Request::HighlightText { text, category } => {
                ctl.flash(&text, category.as_deref()).map(|outcome| Response {
                    categories: outcome.categories.clone(),
                    ..Response::found(outcome.found())
                })
            }
            Request::HighlightAndScroll {
                text,
                category,
                flash,
            } => {
                let emphasize = flash.unwrap_or(self.emphasis);
                ctl.highlight_and_reveal(&text, category.as_deref(), emphasize)
                    .map(|outcome| {
                        self.pending_reveal = outcome.reveal;
                        Response {
                            categories: outcome.flash.categories.clone(),
                            ..Response::found(outcome.flash.found())
                        }
                    })
            }
            Request::PinHighlight {
                text,
                category,
                pin_id,
            } => ctl
                .pin(&text, category.as_deref(), pin_id)
                .map(|outcome| Response::found(outcome.found())),
            Request::RemoveHighlightByText { text } => {
                ctl.remove_by_text(&text).map(|_| Response::ok())
            }
            Request::RemoveHighlights { include_pinned } => {
                ctl.remove_all(include_pinned.unwrap_or(false));
                Ok(Response::ok())
            }
            Request::UnpinHighlight { pin_id } => {
                ctl.unpin(&pin_id).map(Response::found)
            }
            Request::LocateText { text } => ctl.locate(&text).map(|located| Response {
                count: Some(located.candidates().len()),
                ..Response::found(located.is_found())
            }),
        };

        match result {
            Ok(response) => response,
            // Empty input is a plain miss for the caller
            Err(HighlightError::Rejected(_)) => Response::found(false),
            Err(HighlightError::Tree(e)) => {
                error!("request failed: {e}");
                Response::failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_model::NodeTree;
    use serde_json::{Value, json};

    fn dispatcher() -> Dispatcher<NodeTree> {
        let tree = NodeTree::from_text(
            "The subject complained of chest pain.\n\nMedical   staff   refused   treatment.\n",
        );
        Dispatcher::new(HighlightController::new(tree), true)
    }

    fn send(dispatcher: &mut Dispatcher<NodeTree>, request: Value) -> Value {
        serde_json::from_str(&dispatcher.handle_json(&request.to_string())).unwrap()
    }

    #[test]
    fn test_highlight_text() {
        let mut d = dispatcher();
        let response = send(
            &mut d,
            json!({"type": "HIGHLIGHT_TEXT", "text": "chest pain", "category": "claim"}),
        );
        assert_eq!(
            response,
            json!({"success": true, "found": true, "categories": ["claim"]})
        );
        assert!(d.take_reveal().is_none());
    }

    #[test]
    fn test_highlight_not_found_and_empty() {
        let mut d = dispatcher();
        let missing = send(&mut d, json!({"type": "HIGHLIGHT_TEXT", "text": "nonexistent passage"}));
        assert_eq!(missing, json!({"success": true, "found": false}));

        let empty = send(&mut d, json!({"type": "HIGHLIGHT_TEXT", "text": "   "}));
        assert_eq!(empty, json!({"success": true, "found": false}));
    }

    #[test]
    fn test_highlight_and_scroll_leaves_reveal() {
        let mut d = dispatcher();
        let response = send(
            &mut d,
            json!({"type": "HIGHLIGHT_AND_SCROLL", "text": "staff refused", "flash": false}),
        );
        assert_eq!(response["found"], json!(true));
        assert_eq!(response["categories"], json!(["highlight"]));

        let reveal = d.take_reveal().unwrap();
        assert!(!reveal.emphasize);
        assert_eq!(d.controller().ephemeral_markers(), vec![reveal.marker]);
        assert!(d.take_reveal().is_none());
    }

    #[test]
    fn test_pin_and_remove_by_text() {
        let mut d = dispatcher();
        let pinned = send(
            &mut d,
            json!({"type": "PIN_HIGHLIGHT", "text": "chest pain", "pinId": "P1"}),
        );
        assert_eq!(pinned, json!({"success": true, "found": true}));
        assert_eq!(d.controller().pins().len(), 1);

        let removed = send(&mut d, json!({"type": "REMOVE_HIGHLIGHT_BY_TEXT", "text": "chest pain"}));
        assert_eq!(removed, json!({"success": true}));
        assert!(d.controller().pins().is_empty());
    }

    #[test]
    fn test_remove_highlights() {
        let mut d = dispatcher();
        send(&mut d, json!({"type": "PIN_HIGHLIGHT", "text": "chest pain", "pinId": "P1"}));
        send(&mut d, json!({"type": "HIGHLIGHT_TEXT", "text": "refused"}));

        let response = send(&mut d, json!({"type": "REMOVE_HIGHLIGHTS"}));
        assert_eq!(response, json!({"success": true}));
        assert_eq!(d.controller().pinned_markers().len(), 1);
        assert!(d.controller().ephemeral_markers().is_empty());

        send(&mut d, json!({"type": "REMOVE_HIGHLIGHTS", "includePinned": true}));
        assert!(d.controller().tree().markers().is_empty());
        assert!(d.controller().pins().is_empty());
    }

    #[test]
    fn test_unpin_and_locate() {
        let mut d = dispatcher();
        send(&mut d, json!({"type": "PIN_HIGHLIGHT", "text": "refused", "pinId": "P9"}));

        let unpinned = send(&mut d, json!({"type": "UNPIN_HIGHLIGHT", "pinId": "P9"}));
        assert_eq!(unpinned, json!({"success": true, "found": true}));
        let again = send(&mut d, json!({"type": "UNPIN_HIGHLIGHT", "pinId": "P9"}));
        assert_eq!(again, json!({"success": true, "found": false}));

        let located = send(&mut d, json!({"type": "LOCATE_TEXT", "text": "Medical staff"}));
        assert_eq!(located, json!({"success": true, "found": true, "count": 1}));
        assert!(d.controller().tree().markers().is_empty());
    }

    #[test]
    fn test_malformed_request() {
        let mut d = dispatcher();
        let response: Value = serde_json::from_str(&d.handle_json("{\"type\": \"EXPLODE\"}")).unwrap();
        assert_eq!(response["success"], json!(false));
        assert!(response["error"].as_str().unwrap().starts_with("malformed request"));

        let response: Value = serde_json::from_str(&d.handle_json("not json")).unwrap();
        assert_eq!(response["success"], json!(false));
    }

    #[test]
    fn test_request_wire_names() {
        let request = Request::from_json(
            r#"{"type":"PIN_HIGHLIGHT","text":"t","category":"c","pinId":"id-1"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::PinHighlight {
                text: "t".into(),
                category: Some("c".into()),
                pin_id: PinId::new("id-1"),
            }
        );
    }
}
