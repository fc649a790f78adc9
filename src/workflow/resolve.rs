use crate::error::SourceError;
use crate::sources::types::ResolvedLocation;
use crate::sources::Geocoder;

/// Resolve the extracted location text with a single geocoder call.
pub async fn resolve(
    geocoder: &dyn Geocoder,
    location_text: &str,
) -> Result<ResolvedLocation, SourceError> {
    let text = location_text.trim();
    match geocoder.geocode(text).await {
        Ok(location) => {
            tracing::info!(
                query = %text,
                display_name = %location.display_name,
                timezone = %location.timezone_id,
                "Location resolved"
            );
            Ok(location)
        }
        Err(e) => {
            tracing::warn!(query = %text, error = %e, "Location resolution failed");
            Err(e)
        }
    }
}
