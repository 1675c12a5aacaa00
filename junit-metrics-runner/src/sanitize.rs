// Copyright (c) The junit-metrics Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of arbitrary test and suite names into metric dimension values.

use unicode_normalization::UnicodeNormalization;

/// Converts `name` into a string made up only of ASCII letters, digits, `_`, `.` and `-`.
///
/// The name is decomposed into NFKD form, characters that are not ASCII are dropped (this
/// removes combining accents, so `ü` becomes `u`), and every remaining character outside the
/// allowed set is replaced with `_`.
///
/// A name made up entirely of non-ASCII characters produces an empty string. That is still a
/// valid dimension value.
pub fn sanitize(name: &str) -> String {
    name.nfkd()
        .filter(char::is_ascii)
        .map(|ch| if is_allowed(ch) { ch } else { '_' })
        .collect()
}

/// Returns true if `ch` may appear in a sanitized name.
#[inline]
pub fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}
