use crate::flow::action::Action;

/// How a reply reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Post a new message.
    Send,
    /// Replace the text of the message whose button was pressed. Falls back to [`Delivery::Send`]
    /// when there is no such message.
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    #[must_use]
    #[inline]
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// One outbound message: text plus an optional grid of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Rows of buttons, top to bottom.
    pub keyboard: Vec<Vec<Button>>,
    pub delivery: Delivery,
}

impl Reply {
    #[must_use]
    #[inline]
    pub fn send(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
            delivery: Delivery::Send,
        }
    }

    #[must_use]
    #[inline]
    pub fn edit(text: impl Into<String>) -> Self {
        Self {
            delivery: Delivery::Edit,
            ..Self::send(text)
        }
    }

    #[must_use]
    #[inline]
    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.keyboard.push(row);
        self
    }

    /// Every action reachable from this reply's buttons, row by row.
    #[allow(clippy::missing_inline_in_public_items, reason = "Called rarely")]
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.keyboard.iter().flatten().map(|button| &button.action)
    }
}
