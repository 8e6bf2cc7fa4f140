//! Current-user and profile endpoints.

use reqwest::Method;
use reqwest::multipart::{Form, Part};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::types::{ProfileUpdate, UserResponse, UserUpdate};

#[derive(Debug, Clone)]
pub struct UserApi {
    api: ApiClient,
}

impl UserApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn current_user(&self) -> Result<UserResponse, ClientError> {
        self.api.get_json("user/current").await
    }

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> Result<(), ClientError> {
        let builder = self
            .api
            .request(Method::PUT, &format!("user/{id}"))
            .json(update);
        self.api.execute(builder).await?;
        Ok(())
    }

    /// Multipart update; only the fields set on `update` are sent.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ClientError> {
        let mut form = Form::new();
        for (name, value) in update.text_fields() {
            form = form.text(name, value.to_owned());
        }
        if let Some(picture) = update.picture {
            form = form.part("Picture", Part::bytes(picture.bytes).file_name(picture.file_name));
        }

        let builder = self.api.request(Method::PUT, "user/profile").multipart(form);
        self.api.execute(builder).await?;
        Ok(())
    }
}
