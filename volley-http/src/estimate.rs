/// Bytes an HTTP/1.x response head takes on the wire: status line, header lines and the blank
/// line. The reason phrase is not counted.
pub fn response_head_bytes(
    version: http::Version,
    status: http::StatusCode,
    headers: &http::HeaderMap,
) -> u64 {
    let version = match version {
        http::Version::HTTP_10 => "HTTP/1.0",
        http::Version::HTTP_2 => "HTTP/2",
        http::Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/1.1",
    };
    // "HTTP/1.1 200\r\n"
    let status_line = (version.len() + 1 + status.as_str().len() + 2) as u64;

    headers
        .iter()
        .map(|(name, value)| (name.as_str().len() + 2 + value.len() + 2) as u64)
        .fold(status_line, u64::saturating_add)
        .saturating_add(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_status_line_headers_and_terminator() {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::CONTENT_LENGTH, http::HeaderValue::from_static("5"));

        // "HTTP/1.1 200\r\n" + "content-length: 5\r\n" + "\r\n"
        assert_eq!(
            response_head_bytes(http::Version::HTTP_11, http::StatusCode::OK, &headers),
            14 + 19 + 2
        );
        assert_eq!(
            response_head_bytes(
                http::Version::HTTP_10,
                http::StatusCode::NOT_FOUND,
                &http::HeaderMap::new()
            ),
            16
        );
    }
}
