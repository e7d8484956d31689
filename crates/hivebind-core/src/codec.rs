//! Type-directed conversion between semantic setting types and raw values.
//!
//! Every type a field may be declared with implements [`SettingValue`]:
//! one `encode`/`decode` pair per type, so supporting a new type is a
//! single impl.  Decoding is strict: a raw kind the type never writes is a
//! [`DecodeError::KindMismatch`], never a silent default.
//!
//! | Type | Raw form | Also decodes from |
//! |------|----------|-------------------|
//! | enumeration ([`settings_ordinal!`](crate::settings_ordinal)) | `Dword` ordinal | level name in `String`/`ExpandString` |
//! | `bool` | `Dword` 0/1 | |
//! | `u32`, `i32` | `Dword` | |
//! | `u64`, `i64` | `Qword` | `Dword` (for `u64`) |
//! | `String`, `PathBuf` | `String` | `ExpandString` (not expanded) |
//! | `Vec<String>` | `MultiString` | |
//! | `Vec<u8>` | `Binary` | |

use std::borrow::Cow;
use std::path::PathBuf;

use tracing::warn;

use crate::domain::error::DecodeError;
use crate::domain::raw::{RawKind, RawValue};

/// Conversion between a Rust type and its store-native representation.
///
/// `decode(encode(v)) == Ok(v)` holds for every value of every impl.
pub trait SettingValue: Sized {
    /// The raw kind produced by [`SettingValue::encode`].
    const KIND: RawKind;

    /// Converts the value to its raw form.
    fn encode(&self) -> RawValue;

    /// Converts a raw value back, rejecting kinds and ranges the type
    /// does not accept.
    fn decode(raw: RawValue) -> Result<Self, DecodeError>;
}

fn mismatch(expected: RawKind, found: &RawValue) -> DecodeError {
    DecodeError::KindMismatch {
        expected,
        found: found.kind(),
    }
}

impl SettingValue for bool {
    const KIND: RawKind = RawKind::Dword;

    fn encode(&self) -> RawValue {
        RawValue::Dword(u32::from(*self))
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Dword(0) => Ok(false),
            RawValue::Dword(1) => Ok(true),
            RawValue::Dword(other) => Err(DecodeError::OutOfRange {
                value: u64::from(other),
            }),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for u32 {
    const KIND: RawKind = RawKind::Dword;

    fn encode(&self) -> RawValue {
        RawValue::Dword(*self)
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Dword(v) => Ok(v),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for i32 {
    const KIND: RawKind = RawKind::Dword;

    fn encode(&self) -> RawValue {
        RawValue::Dword(*self as u32)
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Dword(v) => Ok(v as i32),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for u64 {
    const KIND: RawKind = RawKind::Qword;

    fn encode(&self) -> RawValue {
        RawValue::Qword(*self)
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Qword(v) => Ok(v),
            // Lossless widening; tools often write small numbers as DWORD.
            RawValue::Dword(v) => Ok(u64::from(v)),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for i64 {
    const KIND: RawKind = RawKind::Qword;

    fn encode(&self) -> RawValue {
        RawValue::Qword(*self as u64)
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Qword(v) => Ok(v as i64),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for String {
    const KIND: RawKind = RawKind::String;

    fn encode(&self) -> RawValue {
        RawValue::String(self.clone())
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::String(s) | RawValue::ExpandString(s) => Ok(s),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for PathBuf {
    const KIND: RawKind = RawKind::String;

    /// Non-UTF-8 components are replaced with U+FFFD and a warning is
    /// logged; the stored path will not match the original.
    fn encode(&self) -> RawValue {
        match self.to_string_lossy() {
            Cow::Borrowed(text) => RawValue::String(text.to_string()),
            Cow::Owned(text) => {
                warn!(path = %text, "path is not valid Unicode, storing lossy form");
                RawValue::String(text)
            }
        }
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        String::decode(raw).map(PathBuf::from)
    }
}

impl SettingValue for Vec<String> {
    const KIND: RawKind = RawKind::MultiString;

    fn encode(&self) -> RawValue {
        RawValue::MultiString(self.clone())
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::MultiString(items) => Ok(items),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl SettingValue for Vec<u8> {
    const KIND: RawKind = RawKind::Binary;

    fn encode(&self) -> RawValue {
        RawValue::Binary(self.clone())
    }

    fn decode(raw: RawValue) -> Result<Self, DecodeError> {
        match raw {
            RawValue::Binary(bytes) => Ok(bytes),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

/// Implements [`SettingValue`] for a fieldless enum stored as a `Dword`
/// ordinal.
///
/// Decoding also accepts the variant name as a string (ASCII
/// case-insensitive), which is what people type into a registry editor.
/// Ordinals not listed decode to [`DecodeError::OutOfRange`].
///
/// ```rust
/// use hivebind_core::{settings_ordinal, SettingValue, RawValue};
///
/// #[derive(Debug, PartialEq)]
/// enum Mode { Off, Fast }
///
/// settings_ordinal!(Mode { Off = 0, Fast = 1 });
///
/// assert_eq!(Mode::Fast.encode(), RawValue::Dword(1));
/// assert_eq!(Mode::decode(RawValue::String("fast".into())), Ok(Mode::Fast));
/// ```
#[macro_export]
macro_rules! settings_ordinal {
    ($ty:ty { $($variant:ident = $ordinal:literal),+ $(,)? }) => {
        impl $crate::SettingValue for $ty {
            const KIND: $crate::RawKind = $crate::RawKind::Dword;

            fn encode(&self) -> $crate::RawValue {
                match self {
                    $( Self::$variant => $crate::RawValue::Dword($ordinal), )+
                }
            }

            fn decode(
                raw: $crate::RawValue,
            ) -> ::core::result::Result<Self, $crate::DecodeError> {
                match raw {
                    $crate::RawValue::Dword(ordinal) => match ordinal {
                        $( $ordinal => ::core::result::Result::Ok(Self::$variant), )+
                        other => ::core::result::Result::Err($crate::DecodeError::OutOfRange {
                            value: u64::from(other),
                        }),
                    },
                    $crate::RawValue::String(token) | $crate::RawValue::ExpandString(token) => {
                        let wanted = token.trim();
                        $(
                            if wanted.eq_ignore_ascii_case(stringify!($variant)) {
                                return ::core::result::Result::Ok(Self::$variant);
                            }
                        )+
                        ::core::result::Result::Err($crate::DecodeError::UnknownToken(token))
                    }
                    other => ::core::result::Result::Err($crate::DecodeError::KindMismatch {
                        expected: $crate::RawKind::Dword,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Level {
        Off,
        Error,
        Warn,
        Info,
    }

    crate::settings_ordinal!(Level {
        Off = 0,
        Error = 1,
        Warn = 2,
        Info = 3,
    });

    #[test]
    fn test_ordinal_encodes_level_as_dword() {
        assert_eq!(Level::Warn.encode(), RawValue::Dword(2));
        assert_eq!(<Level as SettingValue>::KIND, RawKind::Dword);
    }

    #[test]
    fn test_ordinal_decodes_each_defined_level() {
        for (ordinal, level) in [(0, Level::Off), (1, Level::Error), (2, Level::Warn), (3, Level::Info)] {
            assert_eq!(Level::decode(RawValue::Dword(ordinal)), Ok(level));
        }
    }

    #[test]
    fn test_ordinal_out_of_range_is_rejected() {
        assert_eq!(
            Level::decode(RawValue::Dword(99)),
            Err(DecodeError::OutOfRange { value: 99 })
        );
    }

    #[test]
    fn test_ordinal_accepts_level_name_token() {
        assert_eq!(Level::decode(RawValue::String(" INFO ".into())), Ok(Level::Info));
        assert_eq!(
            Level::decode(RawValue::ExpandString("warn".into())),
            Ok(Level::Warn)
        );
    }

    #[test]
    fn test_ordinal_rejects_unknown_token() {
        assert_eq!(
            Level::decode(RawValue::String("verbose".into())),
            Err(DecodeError::UnknownToken("verbose".into()))
        );
    }

    #[test]
    fn test_ordinal_rejects_binary() {
        assert_eq!(
            Level::decode(RawValue::Binary(vec![2])),
            Err(DecodeError::KindMismatch {
                expected: RawKind::Dword,
                found: RawKind::Binary,
            })
        );
    }

    #[test]
    fn test_bool_decodes_zero_and_one_only() {
        assert_eq!(bool::decode(RawValue::Dword(0)), Ok(false));
        assert_eq!(bool::decode(RawValue::Dword(1)), Ok(true));
        assert_eq!(
            bool::decode(RawValue::Dword(2)),
            Err(DecodeError::OutOfRange { value: 2 })
        );
    }

    #[test]
    fn test_bool_encodes_as_zero_or_one() {
        assert_eq!(false.encode(), RawValue::Dword(0));
        assert_eq!(true.encode(), RawValue::Dword(1));
    }

    #[test]
    fn test_string_is_identity_and_keeps_empty() {
        assert_eq!(String::new().encode(), RawValue::String(String::new()));
        assert_eq!(String::decode(RawValue::String(String::new())), Ok(String::new()));
    }

    #[test]
    fn test_string_accepts_expand_string_unexpanded() {
        let raw = RawValue::ExpandString(r"%ProgramData%\Logs".into());
        assert_eq!(String::decode(raw), Ok(r"%ProgramData%\Logs".to_string()));
    }

    #[test]
    fn test_string_rejects_integer() {
        assert_eq!(
            String::decode(RawValue::Dword(5)),
            Err(DecodeError::KindMismatch {
                expected: RawKind::String,
                found: RawKind::Dword,
            })
        );
    }

    #[test]
    fn test_path_round_trips_through_string() {
        let path = PathBuf::from(r"C:\Program Files\Vendor\middleware.dll");
        let raw = path.encode();
        assert_eq!(raw.kind(), RawKind::String);
        assert_eq!(PathBuf::decode(raw), Ok(path));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_path_is_stored_lossy() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // Arrange: 0xff is never valid UTF-8
        let path = PathBuf::from(OsStr::from_bytes(b"/var/log/\xffdir"));

        // Act
        let raw = path.encode();

        // Assert
        assert_eq!(raw, RawValue::String("/var/log/\u{fffd}dir".into()));
        assert_ne!(PathBuf::decode(raw), Ok(path));
    }

    #[test]
    fn test_signed_integers_bit_cast() {
        assert_eq!((-1i32).encode(), RawValue::Dword(u32::MAX));
        assert_eq!(i32::decode(RawValue::Dword(u32::MAX)), Ok(-1));
        assert_eq!(i64::decode((-42i64).encode()), Ok(-42));
    }

    #[test]
    fn test_u64_widens_dword_but_u32_rejects_qword() {
        assert_eq!(u64::decode(RawValue::Dword(7)), Ok(7));
        assert!(u32::decode(RawValue::Qword(7)).is_err());
    }

    #[test]
    fn test_multi_string_and_binary_are_identity() {
        let items = vec!["a".to_string(), String::new(), "c".to_string()];
        assert_eq!(Vec::<String>::decode(items.encode()), Ok(items));

        let bytes = vec![0u8, 1, 255];
        assert_eq!(Vec::<u8>::decode(bytes.encode()), Ok(bytes));
    }
}
