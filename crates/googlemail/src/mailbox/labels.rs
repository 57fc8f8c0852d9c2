//! Label lookup

use super::Mailbox;
use crate::error::Result;
use crate::gmail::MailService;
use crate::models::Label;

impl<S: MailService> Mailbox<S> {
    /// Every label in the mailbox, system labels included
    pub fn get_all_labels(&self) -> Result<Vec<Label>> {
        let response = self.service.list_labels(&self.user_email)?;
        Ok(response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(Label::from)
            .collect())
    }

    /// The label with exactly this display name, if any
    pub fn get_label(&self, name: &str) -> Result<Option<Label>> {
        Ok(self
            .get_all_labels()?
            .into_iter()
            .find(|label| label.name == name))
    }
}
