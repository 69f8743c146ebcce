use url::Url;

use crate::errors::ClientError;

/// Appends percent-escaped path segments to `base`.
pub fn endpoint<S: AsRef<str>>(base: &str, segments: &[S]) -> Result<Url, ClientError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments.iter().map(|segment| segment.as_ref()));
    Ok(url)
}
