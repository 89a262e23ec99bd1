use crate::error::{GraphError, Result};

/// Turn a stored image path into the URL handed to Instagram.
///
/// Hosted images (`https://...`) are used as-is. Local upload paths are
/// joined onto the public base URL, which must then be configured.
pub fn resolve_image_url(image_path: &str, public_base_url: Option<&str>) -> Result<String> {
    if image_path.starts_with("https://") {
        return Ok(image_path.to_string());
    }

    let base = public_base_url
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| GraphError::Config("PUBLIC_URL/BASE_URL is missing".into()))?;

    let relative = image_path.replace('\\', "/");
    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    ))
}

/// Instagram fetches the image itself, so it has to be reachable over
/// public HTTPS.
pub fn check_public_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(GraphError::InvalidImageUrl("Image URL is missing".into()));
    }
    if !url.starts_with("https://") {
        return Err(GraphError::InvalidImageUrl(
            "Public URL must be https and publicly accessible".into(),
        ));
    }
    if url.contains("localhost") || url.contains("127.0.0.1") {
        return Err(GraphError::InvalidImageUrl(
            "Image URL is not publicly accessible (localhost)".into(),
        ));
    }
    Ok(())
}
