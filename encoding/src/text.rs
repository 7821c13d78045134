//! Validation of element values against their VR's length and
//! character repertoire rules.
use crate::error::{CharsetViolationSnafu, InvalidLengthSnafu, Result};
use pacs_core::{Tag, VR};

/// Validate a raw value against the VR's constraints:
/// byte length a multiple of the fixed size where applicable,
/// maximum length, and the character repertoire for string VRs.
///
/// The tag is only used for error reporting.
pub fn validate_value(tag: Tag, vr: VR, bytes: &[u8]) -> Result<()> {
    let meta = vr.meta();
    if let Some(size) = meta.fixed_size {
        if bytes.len() % size as usize != 0 {
            return InvalidLengthSnafu {
                tag,
                vr,
                len: bytes.len() as u32,
            }
            .fail();
        }
    }
    if let Some(max) = meta.max_length {
        if bytes.len() as u32 > max {
            return InvalidLengthSnafu {
                tag,
                vr,
                len: bytes.len() as u32,
            }
            .fail();
        }
    }
    if vr.is_string() {
        validate_charset(vr, bytes)?;
    }
    Ok(())
}

/// Check every byte of a string value against the VR's repertoire.
/// Trailing padding and the multi-value separator `\` are accepted
/// where the VR allows multiple values.
pub fn validate_charset(vr: VR, bytes: &[u8]) -> Result<()> {
    let pad = vr.padding();
    // strip trailing padding before the per-character check
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == pad {
        end -= 1;
    }
    let body = &bytes[..end];

    if vr == VR::AS {
        return validate_age_string(body);
    }

    for &b in body {
        let ok = match vr {
            VR::CS => b.is_ascii_uppercase() || b.is_ascii_digit() || b == b' ' || b == b'_' || b == b'\\',
            VR::DA => b.is_ascii_digit(),
            VR::TM => b.is_ascii_digit() || b == b'.' || b == b':',
            VR::DT => b.is_ascii_digit() || b == b'.' || b == b'+' || b == b'-' || b == b' ',
            VR::UI => b.is_ascii_digit() || b == b'.' || b == b'\\',
            VR::DS => {
                b.is_ascii_digit()
                    || b == b'+'
                    || b == b'-'
                    || b == b'.'
                    || b == b'E'
                    || b == b'e'
                    || b == b' '
                    || b == b'\\'
            }
            VR::IS => b.is_ascii_digit() || b == b'+' || b == b'-' || b == b'\\',
            // free text: printable ASCII plus the permitted controls
            VR::ST | VR::LT | VR::UT => {
                (0x20..0x7F).contains(&b) || b == b'\r' || b == b'\n' || b == 0x0C || b == b'\t' || b == 0x1B
            }
            // short character strings: printable ASCII
            VR::AE | VR::LO | VR::PN | VR::SH | VR::UC | VR::UR => (0x20..0x7F).contains(&b) || b == 0x1B,
            _ => true,
        };
        if !ok {
            return CharsetViolationSnafu { vr, byte: b }.fail();
        }
    }
    Ok(())
}

/// AS values are exactly `nnnD`, `nnnW`, `nnnM` or `nnnY`.
fn validate_age_string(body: &[u8]) -> Result<()> {
    let bad = |byte: u8| CharsetViolationSnafu { vr: VR::AS, byte }.fail();
    if body.is_empty() {
        return Ok(());
    }
    if body.len() != 4 {
        return bad(*body.last().unwrap_or(&0));
    }
    for &b in &body[..3] {
        if !b.is_ascii_digit() {
            return bad(b);
        }
    }
    match body[3] {
        b'D' | b'W' | b'M' | b'Y' => Ok(()),
        other => bad(other),
    }
}
