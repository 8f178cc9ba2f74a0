use serde::Deserialize;

use super::{non_blank, FormErrors, REQUIRED};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    pub text: Option<String>,
}

impl CommentForm {
    /// The trimmed comment text.
    pub fn clean(&self) -> Result<String, FormErrors> {
        match non_blank(self.text.as_deref()) {
            Some(text) => Ok(text.to_string()),
            None => {
                let mut errors = FormErrors::new();
                errors.add("text", REQUIRED);
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_is_invalid() {
        let form = CommentForm {
            text: Some(" \n ".into()),
        };
        assert!(form.clean().is_err());
        assert!(CommentForm::default().clean().is_err());
    }

    #[test]
    fn comment_text_is_trimmed() {
        let form = CommentForm {
            text: Some("  nice post ".into()),
        };
        assert_eq!(form.clean().unwrap(), "nice post");
    }
}
