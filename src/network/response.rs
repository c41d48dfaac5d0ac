//! HTTP/1.x response reader: head via `httparse`, then the body by chunked
//! coding, `Content-Length`, or until the peer closes.

use std::io;

use bytes::Buf;
use bytes::Bytes;
use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use super::HttpResponse;
use crate::TransportError;

const MAX_HEADERS: usize = 64;
const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;
const READ_CHUNK: usize = 8 * 1024;

struct Head {
    status: u16,
    headers: Vec<(String, String)>,
}

pub(crate) async fn read_response<R>(stream: &mut R) -> std::result::Result<HttpResponse, TransportError>
where
    R: AsyncRead + Unpin,
{
    read_response_limited(stream, MAX_BODY_SIZE).await
}

/// Like [`read_response`], rejecting bodies longer than `max_body` bytes.
pub(crate) async fn read_response_limited<R>(
    stream: &mut R,
    max_body: usize,
) -> std::result::Result<HttpResponse, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    // Interim 1xx responses carry no body and precede the real one.
    let head = loop {
        let head = read_head(stream, &mut buf).await?;
        if !(100..200).contains(&head.status) || head.status == 101 {
            break head;
        }
    };

    let body = if !has_body(head.status) {
        Bytes::new()
    } else if is_chunked(&head.headers) {
        read_chunked(stream, &mut buf, max_body).await?
    } else if let Some(len) = content_length(&head.headers)? {
        read_exact_body(stream, &mut buf, len, max_body).await?
    } else {
        read_to_close(stream, &mut buf, max_body).await?
    };

    Ok(HttpResponse {
        status: head.status,
        headers: head.headers,
        body,
    })
}

async fn read_head<R>(
    stream: &mut R,
    buf: &mut BytesMut,
) -> std::result::Result<Head, TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if !buf.is_empty() {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut response = httparse::Response::new(&mut headers);
            let parsed = response
                .parse(&buf[..])
                .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

            if let httparse::Status::Complete(len) = parsed {
                let status = response
                    .code
                    .ok_or_else(|| TransportError::MalformedResponse("missing status code".to_string()))?;
                let headers = response
                    .headers
                    .iter()
                    .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                    .collect();
                buf.advance(len);
                return Ok(Head { status, headers });
            }
        }

        if buf.len() >= MAX_HEAD_SIZE {
            return Err(TransportError::MalformedResponse(format!(
                "response head exceeds {MAX_HEAD_SIZE} bytes"
            )));
        }
        fill(stream, buf).await?;
    }
}

async fn read_chunked<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    max_body: usize,
) -> std::result::Result<Bytes, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let (consumed, size) = match httparse::parse_chunk_size(&buf[..]) {
            Ok(httparse::Status::Complete(parsed)) => parsed,
            Ok(httparse::Status::Partial) => {
                fill(stream, buf).await?;
                continue;
            }
            Err(_) => return Err(TransportError::MalformedResponse("invalid chunk size".to_string())),
        };
        buf.advance(consumed);

        if size == 0 {
            skip_trailers(stream, buf).await?;
            return Ok(body.freeze());
        }

        let size = usize::try_from(size)
            .ok()
            .filter(|size| body.len().saturating_add(*size) <= max_body)
            .ok_or_else(|| body_too_large(max_body))?;
        let end = size
            .checked_add(2)
            .ok_or_else(|| TransportError::MalformedResponse("chunk too large".to_string()))?;
        while buf.len() < end {
            fill(stream, buf).await?;
        }
        body.extend_from_slice(&buf[..size]);
        if &buf[size..end] != b"\r\n" {
            return Err(TransportError::MalformedResponse("chunk not terminated by CRLF".to_string()));
        }
        buf.advance(end);
    }
}

async fn skip_trailers<R>(
    stream: &mut R,
    buf: &mut BytesMut,
) -> std::result::Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if buf.starts_with(b"\r\n") {
            buf.advance(2);
            return Ok(());
        }
        match buf.windows(2).position(|w| w == b"\r\n") {
            Some(end) => buf.advance(end + 2),
            None => fill(stream, buf).await?,
        }
    }
}

async fn read_exact_body<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    len: usize,
    max_body: usize,
) -> std::result::Result<Bytes, TransportError>
where
    R: AsyncRead + Unpin,
{
    if len > max_body {
        return Err(body_too_large(max_body));
    }
    while buf.len() < len {
        fill(stream, buf).await?;
    }
    Ok(buf.split_to(len).freeze())
}

async fn read_to_close<R>(
    stream: &mut R,
    buf: &mut BytesMut,
    max_body: usize,
) -> std::result::Result<Bytes, TransportError>
where
    R: AsyncRead + Unpin,
{
    loop {
        buf.reserve(READ_CHUNK);
        let read = stream.read_buf(buf).await?;
        if buf.len() > max_body {
            return Err(body_too_large(max_body));
        }
        if read == 0 {
            return Ok(buf.split().freeze());
        }
    }
}

async fn fill<R>(
    stream: &mut R,
    buf: &mut BytesMut,
) -> std::result::Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    buf.reserve(READ_CHUNK);
    if stream.read_buf(buf).await? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed before response completed").into());
    }
    Ok(())
}

fn body_too_large(max_body: usize) -> TransportError {
    TransportError::MalformedResponse(format!("response body exceeds {max_body} bytes"))
}

fn has_body(status: u16) -> bool {
    !(status == 204 || status == 304 || (100..200).contains(&status))
}

fn is_chunked(headers: &[(String, String)]) -> bool {
    headers.iter().any(|(name, value)| {
        name.eq_ignore_ascii_case("transfer-encoding")
            && value
                .rsplit(',')
                .next()
                .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
    })
}

fn content_length(headers: &[(String, String)]) -> std::result::Result<Option<usize>, TransportError> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| TransportError::MalformedResponse(format!("invalid content-length: {value}")))
        })
        .transpose()
}
