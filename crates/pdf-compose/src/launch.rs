//! Process launch arguments
//!
//! Besides plain file paths the application can be activated through a URI of
//! the form `img2pdf:?files=<path>,<path>`, where each path is percent-encoded.

use crate::types::*;
use std::path::PathBuf;

/// Scheme of activation URIs, without the trailing colon
pub const URI_SCHEME: &str = "img2pdf";

/// Collect input paths from process arguments (including the program name).
///
/// URI entries that do not decode to UTF-8 are logged and skipped.
pub fn parse_launch_args<I, S>(args: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    collect_input_paths(args.into_iter().skip(1))
}

/// Like [`parse_launch_args`], for arguments without the program name
pub fn collect_input_paths<I, S>(inputs: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut paths = Vec::new();
    for arg in inputs {
        let arg = arg.as_ref();
        if has_uri_scheme(arg) {
            match parse_launch_uri(arg) {
                Ok(uri_paths) => paths.extend(uri_paths),
                Err(e) => log::error!("Failed to parse launch URI {}: {}", arg, e),
            }
        } else if !arg.is_empty() {
            paths.push(PathBuf::from(arg));
        }
    }
    paths
}

fn has_uri_scheme(arg: &str) -> bool {
    arg.len() > URI_SCHEME.len()
        && arg.is_char_boundary(URI_SCHEME.len())
        && arg[..URI_SCHEME.len()].eq_ignore_ascii_case(URI_SCHEME)
        && arg[URI_SCHEME.len()..].starts_with(':')
}

/// Extract the paths carried by the `files` query parameter of an activation URI
pub fn parse_launch_uri(uri: &str) -> Result<Vec<PathBuf>> {
    if !has_uri_scheme(uri) {
        return Err(ComposeError::InvalidLaunchArgument(format!(
            "expected {}: URI, got {}",
            URI_SCHEME, uri
        )));
    }

    let rest = &uri[URI_SCHEME.len() + 1..];
    let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
    let Some((_, query)) = rest.split_once('?') else {
        return Ok(Vec::new());
    };

    let mut files = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if percent_decode(key).as_deref() == Some("files") {
            files = Some(value);
            break;
        }
    }

    let Some(files) = files else {
        return Ok(Vec::new());
    };

    let mut paths = Vec::new();
    for encoded in files.split(',') {
        match percent_decode(encoded) {
            Some(decoded) if !decoded.is_empty() => paths.push(PathBuf::from(decoded)),
            Some(_) => {}
            None => log::warn!("Skipping launch path that is not valid UTF-8: {}", encoded),
        }
    }
    Ok(paths)
}

/// Decode `%XX` escapes and `+` (space) in a URI query component.
///
/// A `%` not followed by two hex digits is kept as-is. Returns `None` when the
/// decoded bytes are not UTF-8.
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => match bytes.get(i + 1..i + 3).and_then(hex_byte) {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

fn hex_byte(hex: &[u8]) -> Option<u8> {
    let digit = |b: u8| (b as char).to_digit(16);
    Some((digit(hex[0])? * 16 + digit(hex[1])?) as u8)
}
