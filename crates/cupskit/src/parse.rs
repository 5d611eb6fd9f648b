//! Parsers for the line-oriented output of the CUPS command-line tools.
//!
//! Everything here is a pure function over captured stdout text: no
//! commands are run and no state is held. Parsers fail only on input that
//! does not have the documented shape; they never guess.

use crate::error::{Error, Result};
use crate::types::{DriverEntry, VendorOption};
use std::collections::BTreeMap;

/// Split a line of tool output into shell words.
///
/// CUPS quotes values that contain whitespace, so a plain
/// `split_whitespace` would tear them apart. This follows POSIX shell
/// rules: single quotes are literal, double quotes allow `\"` and `\\`
/// escapes, a backslash outside quotes escapes the next character.
/// Unterminated quotes and trailing escapes are malformed input.
pub fn split_words(input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => {
                            return Err(Error::Parse {
                                message: "unterminated single quote".to_string(),
                            });
                        }
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('\\' | '"')) => current.push(escaped),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => {
                                return Err(Error::Parse {
                                    message: "unterminated double quote".to_string(),
                                });
                            }
                        },
                        Some(ch) => current.push(ch),
                        None => {
                            return Err(Error::Parse {
                                message: "unterminated double quote".to_string(),
                            });
                        }
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => {
                        return Err(Error::Parse {
                            message: "trailing escape character".to_string(),
                        });
                    }
                }
            }
            ch => {
                in_word = true;
                current.push(ch);
            }
        }
    }

    if in_word {
        words.push(current);
    }

    Ok(words)
}

/// Parse `lpoptions -p <dest>` output into an option map.
///
/// The output is one line of `key=value` words; values with spaces are
/// quoted. A word without `=` is a bare flag and maps to `None`. The
/// split happens at the first `=`, so values may themselves contain `=`.
pub fn parse_option_list(raw: &str) -> Result<BTreeMap<String, Option<String>>> {
    let mut options = BTreeMap::new();
    for word in split_words(raw)? {
        match word.split_once('=') {
            Some((key, value)) => {
                options.insert(key.to_string(), Some(value.to_string()));
            }
            None => {
                options.insert(word, None);
            }
        }
    }
    Ok(options)
}

/// Parse `lpoptions -p <dest> -l` output into driver-specific options.
///
/// Each line has the form `NAME/Label: value1 value2 ...` where exactly
/// one value may carry a `*` prefix marking the current selection. The
/// prefix is stripped from both the reported current value and the
/// stored value list.
pub fn parse_vendor_options(raw: &str) -> Result<BTreeMap<String, VendorOption>> {
    let mut options = BTreeMap::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (name, rest) = line.split_once('/').ok_or_else(|| Error::Parse {
            message: format!("driver option line without '/': {line}"),
        })?;
        let (label, rest) = rest.split_once(':').ok_or_else(|| Error::Parse {
            message: format!("driver option line without ':': {line}"),
        })?;

        let mut current = None;
        let mut values = Vec::new();
        for word in split_words(rest)? {
            if let Some(stripped) = word.strip_prefix('*') {
                if current.is_none() {
                    current = Some(stripped.to_string());
                }
                values.push(stripped.to_string());
            } else {
                values.push(word);
            }
        }

        options.insert(
            name.to_string(),
            VendorOption {
                current,
                label: label.to_string(),
                values,
            },
        );
    }

    Ok(options)
}

/// Parse `lpinfo -l -m` output into a driver catalog keyed by name.
///
/// A line starting with `Model:` opens a new record; every line of a
/// record is `key = value`, split at the first `=` with both sides
/// trimmed. Records without a `name` key are malformed. Driver names are
/// stored exactly as reported. A later record with the same name
/// overwrites the earlier one.
pub fn parse_driver_catalog(raw: &str) -> Result<BTreeMap<String, DriverEntry>> {
    let mut segments: Vec<Vec<&str>> = Vec::new();

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("Model:") {
            segments.push(vec![rest]);
        } else if line.trim().is_empty() {
            continue;
        } else if let Some(segment) = segments.last_mut() {
            segment.push(line);
        } else {
            return Err(Error::Parse {
                message: format!("driver catalog line outside any Model record: {line}"),
            });
        }
    }

    let mut drivers = BTreeMap::new();
    for segment in segments {
        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for line in segment {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| Error::Parse {
                message: format!("driver catalog line without '=': {line}"),
            })?;
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
        if fields.is_empty() {
            continue;
        }

        let name = fields.remove("name").ok_or_else(|| Error::Parse {
            message: "driver catalog record without a name".to_string(),
        })?;
        let entry = DriverEntry {
            name: name.clone(),
            make_and_model: fields.remove("make-and-model"),
            natural_language: fields.remove("natural_language"),
            device_id: fields.remove("device-id"),
        };
        drivers.insert(name, entry);
    }

    Ok(drivers)
}

/// Parse `lpstat -c <class>` output into the member list.
///
/// The first line is a fixed header (`members of class <name>:`) and is
/// discarded whole; every shell word of the remaining lines is one
/// member name.
pub fn parse_member_list(raw: &str) -> Result<Vec<String>> {
    let rest = raw.split_once('\n').map_or("", |(_, rest)| rest);
    split_words(rest)
}

/// Parse `lpstat -a` output into destination names.
///
/// Each non-empty line starts with a destination name followed by
/// accepting-state prose; only the first word matters.
pub fn parse_destination_list(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| line.split_whitespace().next().map(str::to_string))
        .collect()
}
