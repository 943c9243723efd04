use std::io;

use futures_lite::{io::BufReader, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn is_blank_line(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

fn trim_whitespace(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t' | b'\r' | b'\n', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t' | b'\r' | b'\n'] = bytes {
        bytes = rest;
    }
    bytes
}

// Reads the response status line from the stream
pub async fn read_response_status_line<S>(reader: &mut BufReader<S>) -> io::Result<String>
where
    S: AsyncRead + Unpin,
{
    let mut response_status_line = Vec::new();
    if reader.read_until(b'\n', &mut response_status_line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before a status line was received",
        ));
    }
    // Only the version and code matter, the reason phrase may be in any charset
    Ok(String::from_utf8_lossy(&response_status_line).into_owned())
}

// Parses the response status line into a version and status code
pub fn parse_response_status_line(response_status_line: &str) -> io::Result<(Version, StatusCode)> {
    let response_status_line_parts: Vec<&str> = response_status_line.split_whitespace().collect();
    if response_status_line_parts.len() < 2 {
        return Err(invalid_data(format!(
            "failed to parse response status line: {:?}",
            response_status_line.trim_end()
        )));
    }

    let response_version = match response_status_line_parts[0] {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        other => return Err(invalid_data(format!("unsupported HTTP version: {other}"))),
    };

    let response_status = response_status_line_parts[1]
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| invalid_data(format!("invalid status code: {}", response_status_line_parts[1])))?;
    Ok((response_version, response_status))
}

// Reads the response headers, keeping every value of repeated headers in order.
// Values are kept as raw bytes, so latin-1 text in a header is not an error.
pub async fn read_response_headers<S>(reader: &mut BufReader<S>) -> io::Result<HeaderMap<HeaderValue>>
where
    S: AsyncRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut line = Vec::new();

    while reader.read_until(b'\n', &mut line).await? != 0 && !is_blank_line(&line) {
        let parsed = line.iter().position(|&b| b == b':').map(|colon| {
            (
                HeaderName::from_bytes(trim_whitespace(&line[..colon])),
                HeaderValue::from_bytes(trim_whitespace(&line[colon + 1..])),
            )
        });
        match parsed {
            Some((Ok(header_name), Ok(header_value))) => {
                headers.append(header_name, header_value);
            }
            _ => log::warn!("Failed to parse header line: {}", String::from_utf8_lossy(&line).trim_end()),
        }
        line.clear();
    }

    Ok(headers)
}

// Reads exactly `len` bytes onto the end of `body`, growing it only as data arrives
async fn read_sized<S>(reader: &mut BufReader<S>, len: u64, body: &mut Vec<u8>) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    let read = (&mut *reader).take(len).read_to_end(body).await?;
    if (read as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection closed after {read} of {len} body bytes"),
        ));
    }
    Ok(())
}

/// Status line plus headers.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

pub async fn read_response_head<S>(reader: &mut BufReader<S>) -> io::Result<ResponseHead>
where
    S: AsyncRead + Unpin,
{
    let response_status_line = read_response_status_line(reader).await?;
    log::debug!("response_status_line = {}", response_status_line.trim_end());
    let (version, status) = parse_response_status_line(&response_status_line)?;
    let headers = read_response_headers(reader).await?;
    log::debug!("response_version = {version:?}, response_headers = {headers:?}");

    Ok(ResponseHead { status, headers })
}

// Reads a chunked HTTP body from the provided BufReader
pub async fn read_chunked_body<S>(reader: &mut BufReader<S>) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    let mut chunk_size_line = Vec::new();

    loop {
        if reader.read_until(b'\n', &mut chunk_size_line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside chunked body",
            ));
        }
        // Chunk extensions after ';' are ignored
        let size = chunk_size_line.split(|&b| b == b';').next().unwrap_or_default();
        let size = String::from_utf8_lossy(trim_whitespace(size)).into_owned();
        let chunk_size = u64::from_str_radix(&size, 16)
            .map_err(|_| invalid_data(format!("invalid chunk size: {size:?}")))?;

        if chunk_size == 0 {
            break;
        }

        read_sized(reader, chunk_size, &mut body).await?;

        let mut crlf = [0; 2];
        reader.read_exact(&mut crlf).await?;
        if &crlf != b"\r\n" {
            return Err(invalid_data("invalid chunked encoding: missing CRLF"));
        }
        chunk_size_line.clear();
    }

    // Trailers up to the terminating blank line
    let mut trailer = Vec::new();
    while reader.read_until(b'\n', &mut trailer).await? != 0 && !is_blank_line(&trailer) {
        trailer.clear();
    }

    Ok(body)
}

/// Whether a response to `method` with `status` can carry a body at all.
pub fn has_body(method: &Method, status: StatusCode) -> bool {
    !(method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

// Reads the response body based on headers
pub async fn read_response_body<S>(reader: &mut BufReader<S>, headers: &HeaderMap<HeaderValue>) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let chunked = headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.to_ascii_lowercase().contains("chunked"));

    if chunked {
        read_chunked_body(reader).await
    } else if let Some(content_length_value) = headers.get(CONTENT_LENGTH) {
        let content_length = content_length_value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| invalid_data(format!("invalid content-length: {content_length_value:?}")))?;
        let mut response_body = Vec::new();
        read_sized(reader, content_length, &mut response_body).await?;
        Ok(response_body)
    } else {
        // No framing, so the server closing the connection ends the body
        let mut response_body = Vec::new();
        reader.read_to_end(&mut response_body).await?;
        Ok(response_body)
    }
}
