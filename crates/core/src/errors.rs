use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("menu item id `{0}` appears more than once in the catalog")]
    DuplicateMenuItem(String),
    #[error("menu item `{item_id}` is invalid: {reason}")]
    InvalidMenuItem { item_id: String, reason: String },
    #[error("menu item `{0}` is not on the menu")]
    ItemUnknown(String),
    #[error("menu item `{0}` is out of stock")]
    OutOfStock(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Reply shown to the guest when this error surfaces in conversation.
    pub fn user_message(&self, display_name: Option<&str>) -> String {
        match self {
            Self::ItemUnknown(item_id) => {
                format!("Sorry, we don't have {item_id} on our menu. 🤔")
            }
            Self::OutOfStock(item_id) => {
                format!("Sorry, {} is out of stock. 🛑", display_name.unwrap_or(item_id))
            }
            Self::DuplicateMenuItem(_)
            | Self::InvalidMenuItem { .. }
            | Self::InvariantViolation(_) => {
                "Something went wrong with our menu. Please try again. 😕".to_string()
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "menu_validation",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config_validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn unknown_item_message_names_the_requested_id() {
        let message = DomainError::ItemUnknown("lobster_roll".to_owned()).user_message(None);
        assert_eq!(message, "Sorry, we don't have lobster_roll on our menu. 🤔");
    }

    #[test]
    fn out_of_stock_message_prefers_display_name() {
        let error = DomainError::OutOfStock("pepperoni_pizza".to_owned());
        assert_eq!(error.user_message(Some("Pepperoni Pizza")), "Sorry, Pepperoni Pizza is out of stock. 🛑");
        assert_eq!(error.user_message(None), "Sorry, pepperoni_pizza is out of stock. 🛑");
    }

    #[test]
    fn domain_errors_classify_as_menu_validation() {
        let error = ApplicationError::from(DomainError::DuplicateMenuItem("coke".to_owned()));
        assert_eq!(error.error_class(), "menu_validation");
        assert!(error.to_string().contains("coke"));
    }
}
