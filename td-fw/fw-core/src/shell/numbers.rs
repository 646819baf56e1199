//! Number parsing for operator input
//!
//! Numbers are decimal or `0x`-prefixed hex, optionally negative. Command
//! lines are split on whitespace and the command word itself counts as the
//! first token, so `md addr count width` has four.

extern crate alloc;

use alloc::format;
use alloc::vec::Vec;
use td_model::ShellError;

/// Parse one number token
pub fn parse_number(token: &str) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    // The sign is only accepted in front; `from_str_radix` would take one anywhere
    if digits.starts_with(['+', '-']) {
        return None;
    }
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if hex.starts_with(['+', '-']) => return None,
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    if negative { value.checked_neg() } else { Some(value) }
}

/// First number on a prompted input line, 0 when there is none
pub fn first_number(line: &str) -> i64 {
    line.split_whitespace()
        .next()
        .and_then(parse_number)
        .unwrap_or(0)
}

/// Split a command line into its numeric arguments
///
/// `expected` counts the command word. The returned vector holds only the
/// arguments after it.
///
/// # Returns
///
/// * `Ok(args)` - exactly `expected - 1` parsed arguments
/// * `Err(ShellError::InvalidArgument)` - wrong token count or a token that is not a number
pub fn command_args(line: &str, expected: usize) -> Result<Vec<i64>, ShellError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != expected {
        return Err(ShellError::InvalidArgument(format!(
            "expected {expected} tokens, got {}",
            tokens.len()
        )));
    }
    tokens[1..]
        .iter()
        .map(|token| {
            parse_number(token)
                .ok_or_else(|| ShellError::InvalidArgument(format!("not a number: {token}")))
        })
        .collect()
}

/// Convert an operator number to an address
pub fn to_address(value: i64) -> Result<u64, ShellError> {
    u64::try_from(value)
        .map_err(|_| ShellError::InvalidArgument(format!("invalid address: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("0x1F"), Some(31));
        assert_eq!(parse_number("0XfF"), Some(255));
        assert_eq!(parse_number("-3"), Some(-3));
        assert_eq!(parse_number("0xFFFFFFFF"), Some(0xffff_ffff));
        assert_eq!(parse_number("zz"), None);
        assert_eq!(parse_number("0x"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_parse_number_rejects_inner_signs() {
        assert_eq!(parse_number("0x-5"), None);
        assert_eq!(parse_number("0x+5"), None);
        assert_eq!(parse_number("--5"), None);
        assert_eq!(parse_number("-+5"), None);
        assert_eq!(parse_number("+5"), None);
        assert_eq!(parse_number("-0x-8000000000000000"), None);
    }

    #[test]
    fn test_parse_number_extremes() {
        assert_eq!(parse_number("-0x8000000000000000"), None);
        assert_eq!(parse_number("-0x7FFFFFFFFFFFFFFF"), Some(-i64::MAX));
        assert_eq!(parse_number("-9223372036854775807"), Some(-i64::MAX));
        assert_eq!(parse_number("9223372036854775808"), None);
    }

    #[test]
    fn test_first_number_defaults_to_zero() {
        assert_eq!(first_number("1\n"), 1);
        assert_eq!(first_number("  0x10 junk\n"), 16);
        assert_eq!(first_number("\n"), 0);
        assert_eq!(first_number("yes\n"), 0);
    }

    #[test]
    fn test_command_args_counts_command_word() {
        assert_eq!(
            command_args("md 0x1000 16 4\n", 4).unwrap(),
            alloc::vec![0x1000, 16, 4]
        );
        assert_eq!(command_args("mr 0x20\n", 2).unwrap(), alloc::vec![0x20]);
        assert!(command_args("mr\n", 2).is_err());
        assert!(command_args("mw 0x20 1 2\n", 3).is_err());
        assert!(command_args("mw 0x20 abc\n", 3).is_err());
    }
}
