use winsys::geometry::Pos;
use winsys::geometry::Region;
use winsys::win32::message::parse_message;
use winsys::window::Hwnd;
pub use winsys::Result;

use std::convert::TryFrom;

use anyhow::anyhow;

/// One meaningful line of a message trace.
///
/// ```text
/// # declared windows, addressed by the handle the trace uses
/// window 0x100 0 0 640 480
/// child 0x110 0x100 10 10 100 100
/// foreign 0x900 700 0 300 300
///
/// # time message hwnd [wparam [lparam [x y]]]
/// 10 WM_MOUSEMOVE 0x110 0 0x00140014 30 30
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Window {
        hwnd: Hwnd,
        parent: Option<Hwnd>,
        region: Region,
    },
    Foreign {
        hwnd: Hwnd,
        region: Region,
    },
    Message {
        time: u32,
        message: u32,
        hwnd: Hwnd,
        wparam: usize,
        lparam: isize,
        pt: Pos,
    },
}

fn parse_int(token: &str) -> Result<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| anyhow!("unable to parse \"{}\" as a number", token))?;

    Ok(if negative { -value } else { value })
}

fn parse_field<T>(
    fields: &[&str],
    index: usize,
    default: Option<T>,
) -> Result<T>
where
    T: TryFrom<i64>,
{
    match fields.get(index) {
        Some(token) => {
            let value = parse_int(token)?;
            T::try_from(value).map_err(|_| anyhow!("value {} is out of range", token))
        },
        None => default.ok_or_else(|| anyhow!("missing field {}", index + 1)),
    }
}

fn parse_region(
    fields: &[&str],
    from: usize,
) -> Result<Region> {
    Ok(Region::new(
        parse_field(fields, from, None)?,
        parse_field(fields, from + 1, None)?,
        parse_field(fields, from + 2, None)?,
        parse_field(fields, from + 3, None)?,
    ))
}

/// Parses a single trace line; blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Line>> {
    let line = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();

    match fields.first() {
        None => Ok(None),
        Some(&"window") => Ok(Some(Line::Window {
            hwnd: parse_field(&fields, 1, None)?,
            parent: None,
            region: parse_region(&fields, 2)?,
        })),
        Some(&"child") => Ok(Some(Line::Window {
            hwnd: parse_field(&fields, 1, None)?,
            parent: Some(parse_field(&fields, 2, None)?),
            region: parse_region(&fields, 3)?,
        })),
        Some(&"foreign") => Ok(Some(Line::Foreign {
            hwnd: parse_field(&fields, 1, None)?,
            region: parse_region(&fields, 2)?,
        })),
        Some(_) => {
            let name = fields
                .get(1)
                .ok_or_else(|| anyhow!("missing message name"))?;

            let message = parse_message(name)
                .ok_or_else(|| anyhow!("unable to resolve message \"{}\"", name))?;

            Ok(Some(Line::Message {
                time: parse_field(&fields, 0, None)?,
                message,
                hwnd: parse_field(&fields, 2, None)?,
                wparam: parse_field(&fields, 3, Some(0))?,
                lparam: parse_field(&fields, 4, Some(0))?,
                pt: Pos::new(
                    parse_field(&fields, 5, Some(0))?,
                    parse_field(&fields, 6, Some(0))?,
                ),
            }))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use winsys::win32::message::WM_LBUTTONDOWN;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   # nothing here").unwrap(), None);
    }

    #[test]
    fn windows_are_declared_with_their_trace_handle() {
        assert_eq!(
            parse_line("child 0x110 0x100 10 10 100 50 # popup").unwrap(),
            Some(Line::Window {
                hwnd: 0x110,
                parent: Some(0x100),
                region: Region::new(10, 10, 100, 50),
            })
        );
    }

    #[test]
    fn messages_default_missing_parameters() {
        assert_eq!(
            parse_line("42 WM_LBUTTONDOWN 0x100 1 -1").unwrap(),
            Some(Line::Message {
                time: 42,
                message: WM_LBUTTONDOWN,
                hwnd: 0x100,
                wparam: 1,
                lparam: -1,
                pt: Pos::new(0, 0),
            })
        );
    }

    #[test]
    fn unknown_messages_are_rejected() {
        assert!(parse_line("1 WM_NOT_A_MESSAGE 0x100").is_err());
        assert!(parse_line("window 0x100 0 0").is_err());
    }
}
