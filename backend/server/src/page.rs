use std::path::Path;

use tokio::fs::read_to_string;

use crate::error::AppError;

pub const KEY_PLACEHOLDER: &str = "{{STRIPE_PUBLISHABLE_KEY}}";

pub fn render(template: &str, publishable_key: &str) -> String {
    template.replace(KEY_PLACEHOLDER, publishable_key)
}

/// Reads the template on every call so edits show up without a restart.
pub async fn landing_page(path: &Path, publishable_key: &str) -> Result<String, AppError> {
    let template = read_to_string(path)
        .await
        .map_err(AppError::PageUnavailable)?;

    Ok(render(&template, publishable_key))
}
