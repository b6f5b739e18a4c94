// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use regex::Regex;

use super::error::*;

const MASK_CHAR: char = '*';
const TOKEN_SEPARATOR: char = '-';

/// Mask a session token or session id for logging.
///
/// Separator characters (`-`) stay where they are, the last `reveal`
/// non-separator characters are kept and every earlier one becomes `*`.
/// When `reveal` is not smaller than the number of non-separator
/// characters the token is returned as is.
///
/// ```rust
/// use arraymgmt::mask_token;
///
/// assert_eq!(mask_token("abcd-ef12-3456", 6), "****-**12-3456");
/// ```
pub fn mask_token(token: &str, reveal: usize) -> String {
    let total = token.chars().filter(|c| *c != TOKEN_SEPARATOR).count();
    let hide = total.saturating_sub(reveal);
    let mut seen: usize = 0;
    token
        .chars()
        .map(|c| {
            if c == TOKEN_SEPARATOR {
                return c;
            }
            seen += 1;
            if seen <= hide {
                MASK_CHAR
            } else {
                c
            }
        })
        .collect()
}

/// Check a front-end port id such as `CL1-A` or `CL3-AB`.
pub fn verify_port_id(port_id: &str) -> Result<()> {
    let regex_port = Regex::new(
        r"(?xi)
        ^CL
        [0-9A-Z]{1,2}       # cluster and controller
        -
        [A-Z]{1,2}$         # port letter
        ",
    )?;
    if regex_port.is_match(port_id) {
        Ok(())
    } else {
        Err(ArrayError::InvalidArgument(format!(
            "Invalid port ID string '{}', expecting format like 'CL1-A'",
            port_id
        )))
    }
}

/// Check a Fibre Channel WWN and return it in the array's canonical form:
/// 16 lower case hex digits with no separator or `0x` prefix.
pub fn normalize_wwn(wwn: &str) -> Result<String> {
    let regex_wwn = Regex::new(
        r"(?x)
        ^(?:0x|0X)?(?:[0-9A-Fa-f]{2})
        (?:(?:[\.:\-])?[0-9A-Fa-f]{2}){7}$
        ",
    )?;
    if !regex_wwn.is_match(wwn) {
        return Err(ArrayError::InvalidArgument(format!(
            "Invalid WWN string '{}'",
            wwn
        )));
    }
    let digits = wwn
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect::<String>()
        .to_lowercase();
    Ok(digits)
}
