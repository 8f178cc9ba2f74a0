use actix_multipart::Multipart;
use actix_web::{http::header, web, HttpRequest};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{non_blank, parse_urlencoded, read_body, FormErrors, REQUIRED};
use crate::error::{AppError, Result};
use crate::media::verify_image;
use crate::models::Group;

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const FILE_AND_CLEAR: &str =
    "Please either submit a file or check the clear checkbox, not both.";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Raw post form fields as submitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostFormInput {
    pub text: Option<String>,
    pub group: Option<String>,
    #[serde(rename = "image-clear")]
    pub image_clear: Option<String>,
    #[serde(skip)]
    pub image: Option<UploadedFile>,
}

/// What to do with the post's image attachment.
#[derive(Debug, Clone)]
pub enum ImageChange {
    Keep,
    Clear,
    Upload(UploadedFile),
}

/// A validated post submission.
#[derive(Debug, Clone)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

impl PostFormInput {
    /// Bind from a multipart or url-encoded request body.
    pub async fn from_payload(
        req: &HttpRequest,
        payload: web::Payload,
        limit: usize,
    ) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            Self::from_multipart(Multipart::new(req.headers(), payload), limit).await
        } else {
            let body = read_body(payload, limit).await?;
            parse_urlencoded(&body)
        }
    }

    async fn from_multipart(mut multipart: Multipart, limit: usize) -> Result<Self> {
        let mut input = PostFormInput::default();
        let mut total = 0usize;

        while let Some(field) = multipart.next().await {
            let mut field =
                field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::BadRequest(format!("Multipart read error: {}", e)))?;
                total += chunk.len();
                if total > limit {
                    return Err(AppError::BadRequest("Upload too large".to_string()));
                }
                data.extend_from_slice(&chunk);
            }

            match name.as_str() {
                "text" => input.text = Some(String::from_utf8_lossy(&data).into_owned()),
                "group" => input.group = Some(String::from_utf8_lossy(&data).into_owned()),
                "image-clear" => {
                    input.image_clear = Some(String::from_utf8_lossy(&data).into_owned())
                }
                "image" => {
                    // Browsers send an unnamed empty part when no file was picked
                    if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                        input.image = Some(UploadedFile {
                            filename,
                            bytes: data,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(input)
    }

    fn clear_requested(&self) -> bool {
        matches!(
            self.image_clear.as_deref().map(str::trim),
            Some("on" | "true" | "1")
        )
    }

    /// Validate against the groups a post may belong to.
    pub fn clean(&self, groups: &[Group]) -> std::result::Result<PostForm, FormErrors> {
        let mut errors = FormErrors::new();

        let text = match non_blank(self.text.as_deref()) {
            Some(text) => text.to_string(),
            None => {
                errors.add("text", REQUIRED);
                String::new()
            }
        };

        let group_id = match non_blank(self.group.as_deref()) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match (&self.image, self.clear_requested()) {
            (Some(_), true) => {
                errors.add("image", FILE_AND_CLEAR);
                ImageChange::Keep
            }
            (Some(file), false) if file.bytes.is_empty() => {
                errors.add("image", EMPTY_FILE);
                ImageChange::Keep
            }
            (Some(file), false) if verify_image(&file.bytes).is_none() => {
                errors.add("image", INVALID_IMAGE);
                ImageChange::Keep
            }
            (Some(file), false) => ImageChange::Upload(file.clone()),
            (None, true) => ImageChange::Clear,
            (None, false) => ImageChange::Keep,
        };

        if errors.is_empty() {
            Ok(PostForm {
                text,
                group_id,
                image,
            })
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\x0a\x00;";

    fn groups() -> Vec<Group> {
        vec![Group {
            id: 3,
            title: "Cats".into(),
            slug: "cats".into(),
            description: String::new(),
        }]
    }

    fn input(text: &str, group: &str) -> PostFormInput {
        PostFormInput {
            text: Some(text.into()),
            group: Some(group.into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_submission_cleans() {
        let form = input("  hello  ", "3").clean(&groups()).unwrap();
        assert_eq!(form.text, "hello");
        assert_eq!(form.group_id, Some(3));
        assert!(matches!(form.image, ImageChange::Keep));
    }

    #[test]
    fn empty_group_means_none() {
        let form = input("hello", "").clean(&groups()).unwrap();
        assert_eq!(form.group_id, None);
    }

    #[test]
    fn blank_text_and_unknown_group_are_reported() {
        let errors = input("   ", "99").clean(&groups()).unwrap_err();
        assert_eq!(errors.get("text"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("group"), Some(&[INVALID_CHOICE.to_string()][..]));
    }

    #[test]
    fn non_image_upload_is_rejected() {
        let mut submitted = input("hello", "");
        submitted.image = Some(UploadedFile {
            filename: "notes.txt".into(),
            bytes: b"plain text".to_vec(),
        });
        let errors = submitted.clean(&groups()).unwrap_err();
        assert_eq!(errors.get("image"), Some(&[INVALID_IMAGE.to_string()][..]));
    }

    #[test]
    fn corrupted_gif_is_rejected() {
        let mut submitted = input("hello", "");
        submitted.image = Some(UploadedFile {
            filename: "broken.gif".into(),
            bytes: b"GIF89a this is not really an image at all".to_vec(),
        });
        let errors = submitted.clean(&groups()).unwrap_err();
        assert_eq!(errors.get("image"), Some(&[INVALID_IMAGE.to_string()][..]));
    }

    #[test]
    fn gif_upload_is_accepted() {
        let mut submitted = input("hello", "");
        submitted.image = Some(UploadedFile {
            filename: "small.gif".into(),
            bytes: SMALL_GIF.to_vec(),
        });
        let form = submitted.clean(&groups()).unwrap();
        assert!(matches!(form.image, ImageChange::Upload(ref f) if f.filename == "small.gif"));
    }

    #[test]
    fn clear_checkbox_clears_image() {
        let mut submitted = input("hello", "");
        submitted.image_clear = Some("on".into());
        assert!(matches!(
            submitted.clean(&groups()).unwrap().image,
            ImageChange::Clear
        ));
    }
}
