use http::header::{HeaderValue, ValueIter};
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, Uri};

pub(crate) fn connection_close(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .any(|value| connection_has(value, "close"))
}

fn connection_has(value: &HeaderValue, needle: &str) -> bool {
    if let Ok(s) = value.to_str() {
        for val in s.split(',') {
            if val.trim().eq_ignore_ascii_case(needle) {
                return true;
            }
        }
    }
    false
}

pub(crate) fn content_length_parse_all(headers: &HeaderMap) -> Option<u64> {
    content_length_parse_all_values(headers.get_all(CONTENT_LENGTH).into_iter())
}

fn content_length_parse_all_values(values: ValueIter<'_, HeaderValue>) -> Option<u64> {
    // If multiple Content-Length headers were sent, everything can still
    // be alright if they all contain the same value, and all parse
    // correctly. If not, then it's an error.

    let mut content_length: Option<u64> = None;
    for h in values {
        if let Ok(line) = h.to_str() {
            for v in line.split(',') {
                if let Some(n) = from_digits(v.trim().as_bytes()) {
                    if content_length.is_none() {
                        content_length = Some(n)
                    } else if content_length != Some(n) {
                        return None;
                    }
                } else {
                    return None;
                }
            }
        } else {
            return None;
        }
    }

    content_length
}

fn from_digits(bytes: &[u8]) -> Option<u64> {
    // cannot use FromStr for u64, since it allows a signed prefix
    let mut result = 0u64;
    const RADIX: u64 = 10;

    if bytes.is_empty() {
        return None;
    }

    for &b in bytes {
        match b {
            b'0'..=b'9' => {
                result = result.checked_mul(RADIX)?;
                result = result.checked_add((b - b'0') as u64)?;
            }
            _ => {
                // not a DIGIT, get outta here!
                return None;
            }
        }
    }

    Some(result)
}

pub(crate) fn set_content_length_if_missing(headers: &mut HeaderMap, len: u64) {
    headers
        .entry(CONTENT_LENGTH)
        .or_insert_with(|| HeaderValue::from(len));
}

pub(crate) fn set_host_if_missing(headers: &mut HeaderMap, uri: &Uri) {
    if headers.contains_key(HOST) {
        return;
    }
    if let Some(authority) = uri.authority() {
        if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
            headers.insert(HOST, host);
        }
    }
}

pub(crate) fn transfer_encoding_is_chunked(headers: &HeaderMap) -> bool {
    is_chunked(headers.get_all(TRANSFER_ENCODING).into_iter())
}

fn is_chunked(mut encodings: ValueIter<'_, HeaderValue>) -> bool {
    // chunked must always be the last encoding, according to spec
    if let Some(line) = encodings.next_back() {
        return is_chunked_(line);
    }

    false
}

fn is_chunked_(value: &HeaderValue) -> bool {
    // chunked must always be the last encoding, according to spec
    if let Ok(s) = value.to_str() {
        if let Some(encoding) = s.rsplit(',').next() {
            return encoding.trim().eq_ignore_ascii_case("chunked");
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_length_values() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length_parse_all(&headers), None);

        headers.append(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(content_length_parse_all(&headers), Some(12));

        headers.append(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(content_length_parse_all(&headers), Some(12));

        headers.append(CONTENT_LENGTH, HeaderValue::from_static("13"));
        assert_eq!(content_length_parse_all(&headers), None);
    }

    #[test]
    fn content_length_rejects_signs() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("+5"));
        assert_eq!(content_length_parse_all(&headers), None);
    }

    #[test]
    fn chunked_must_be_last() {
        let mut headers = HeaderMap::new();
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, chunked"));
        assert!(transfer_encoding_is_chunked(&headers));

        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked, gzip"));
        assert!(!transfer_encoding_is_chunked(&headers));
    }

    #[test]
    fn connection_close_token() {
        let mut headers = HeaderMap::new();
        assert!(!connection_close(&headers));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, Close"));
        assert!(connection_close(&headers));
    }

    #[test]
    fn host_from_authority() {
        let mut headers = HeaderMap::new();
        set_host_if_missing(&mut headers, &"http://example.com:8080/a".parse().unwrap());
        assert_eq!(headers[HOST], "example.com:8080");

        set_host_if_missing(&mut headers, &"http://other.example/".parse().unwrap());
        assert_eq!(headers[HOST], "example.com:8080");
    }
}
