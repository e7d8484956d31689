//! Windows registry implementation of [`KeyValueStore`].
//!
//! Each [`KeyValueStore::open_key`] call opens (or creates) a real `HKEY`;
//! the handle is closed with `RegCloseKey` when the boxed [`KeyHandle`] is
//! dropped.  Value data is converted between the registry's byte layout and
//! [`RawValue`] here, so nothing above this module sees UTF-16 or
//! little-endian buffers.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Win32 registry FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::iter;

use tracing::trace;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS,
    ERROR_PATH_NOT_FOUND, ERROR_SUCCESS, WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegEnumValueW, RegOpenKeyExW,
    RegQueryValueExW, RegSetValueExW, HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG,
    HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_READ, KEY_WRITE, REG_BINARY,
    REG_DWORD, REG_EXPAND_SZ, REG_MULTI_SZ, REG_OPTION_NON_VOLATILE, REG_QWORD, REG_SAM_FLAGS,
    REG_SZ, REG_VALUE_TYPE,
};

use hivebind_core::{
    AccessMode, DecodeError, KeyHandle, KeyValueStore, RawValue, RootKey, StoreError,
};

/// Longest value name the registry allows, plus the terminator.
const MAX_VALUE_NAME: usize = 16_384;

/// The live Windows registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }
}

fn predefined(root: RootKey) -> HKEY {
    match root {
        RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        RootKey::CurrentUser => HKEY_CURRENT_USER,
        RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
        RootKey::Users => HKEY_USERS,
        RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
    }
}

/// NUL-terminated UTF-16 copy of `s`.
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

/// Maps a Win32 status to `Ok` or the matching [`StoreError`].
fn check(status: WIN32_ERROR) -> Result<(), StoreError> {
    match status {
        ERROR_SUCCESS => Ok(()),
        ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => Err(StoreError::NotFound),
        ERROR_ACCESS_DENIED => Err(StoreError::AccessDenied),
        other => Err(StoreError::Os {
            code: other.0,
            message: std::io::Error::from_raw_os_error(other.0 as i32).to_string(),
        }),
    }
}

impl KeyValueStore for WindowsRegistry {
    fn open_key(
        &self,
        root: RootKey,
        path: &str,
        mode: AccessMode,
    ) -> Result<Box<dyn KeyHandle>, StoreError> {
        let subkey = wide(path);
        let mut hkey = HKEY::default();
        let access: REG_SAM_FLAGS = match mode {
            AccessMode::ReadOnly => KEY_READ,
            AccessMode::ReadWrite | AccessMode::CreateIfMissing => KEY_READ | KEY_WRITE,
        };

        let status = match mode {
            // SAFETY: `subkey` is NUL-terminated and outlives the call;
            // `hkey` is a valid out-pointer.
            AccessMode::ReadOnly | AccessMode::ReadWrite => unsafe {
                RegOpenKeyExW(
                    predefined(root),
                    PCWSTR(subkey.as_ptr()),
                    None,
                    access,
                    &mut hkey,
                )
            },
            // SAFETY: as above; class and security attributes are null and
            // the disposition is not requested.
            AccessMode::CreateIfMissing => unsafe {
                RegCreateKeyExW(
                    predefined(root),
                    PCWSTR(subkey.as_ptr()),
                    None,
                    PCWSTR::null(),
                    REG_OPTION_NON_VOLATILE,
                    access,
                    None,
                    &mut hkey,
                    None,
                )
            },
        };
        check(status)?;
        trace!(%root, path, ?mode, "registry key opened");

        Ok(Box::new(RegistryKey { hkey }))
    }
}

/// An open registry key, closed on drop.
struct RegistryKey {
    hkey: HKEY,
}

impl Drop for RegistryKey {
    fn drop(&mut self) {
        // SAFETY: `hkey` was returned by RegOpenKeyExW/RegCreateKeyExW and
        // is closed exactly once.
        unsafe {
            let _ = RegCloseKey(self.hkey);
        }
    }
}

impl RegistryKey {
    /// Queries the value's type and raw bytes, growing the buffer until the
    /// data fits (it can change size between calls).
    fn query(&self, name: &[u16]) -> Result<(REG_VALUE_TYPE, Vec<u8>), StoreError> {
        let mut kind = REG_VALUE_TYPE::default();
        let mut size: u32 = 0;
        // SAFETY: size-only query; data pointer is None.
        check(unsafe {
            RegQueryValueExW(
                self.hkey,
                PCWSTR(name.as_ptr()),
                None,
                Some(&mut kind),
                None,
                Some(&mut size),
            )
        })?;

        loop {
            let mut data = vec![0u8; size as usize];
            let mut len = size;
            // SAFETY: `data` has exactly `len` writable bytes.
            let status = unsafe {
                RegQueryValueExW(
                    self.hkey,
                    PCWSTR(name.as_ptr()),
                    None,
                    Some(&mut kind),
                    Some(data.as_mut_ptr()),
                    Some(&mut len),
                )
            };
            if status == ERROR_MORE_DATA {
                size = len.max(size.saturating_mul(2)).max(64);
                continue;
            }
            check(status)?;
            data.truncate(len as usize);
            return Ok((kind, data));
        }
    }
}

impl KeyHandle for RegistryKey {
    fn read_value(&self, name: &str) -> Result<RawValue, StoreError> {
        let (kind, data) = self.query(&wide(name))?;
        decode(kind, &data)
    }

    fn write_value(&mut self, name: &str, value: &RawValue) -> Result<(), StoreError> {
        let (kind, data) = encode(value);
        let name = wide(name);
        // SAFETY: `name` is NUL-terminated; `data` is a valid slice.
        check(unsafe {
            RegSetValueExW(self.hkey, PCWSTR(name.as_ptr()), None, kind, Some(data.as_slice()))
        })
    }

    fn delete_value(&mut self, name: &str) -> Result<(), StoreError> {
        let name = wide(name);
        // SAFETY: `name` is NUL-terminated and outlives the call.
        check(unsafe { RegDeleteValueW(self.hkey, PCWSTR(name.as_ptr())) })
    }

    fn value_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut buffer = vec![0u16; MAX_VALUE_NAME];
        for index in 0u32.. {
            let mut len = buffer.len() as u32;
            // SAFETY: `buffer` holds `len` UTF-16 units; type and data are
            // not requested.
            let status = unsafe {
                RegEnumValueW(
                    self.hkey,
                    index,
                    Some(PWSTR(buffer.as_mut_ptr())),
                    &mut len,
                    None,
                    None,
                    None,
                    None,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            check(status)?;
            names.push(String::from_utf16_lossy(&buffer[..len as usize]));
        }
        Ok(names)
    }
}

fn unreadable(reason: impl Into<String>) -> StoreError {
    StoreError::Malformed(DecodeError::Unreadable(reason.into()))
}

fn utf16_units(data: &[u8], kind: &str) -> Result<Vec<u16>, StoreError> {
    if data.len() % 2 != 0 {
        return Err(unreadable(format!(
            "{kind} data has odd length {}",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn utf16_bytes(units: impl IntoIterator<Item = u16>) -> Vec<u8> {
    units.into_iter().flat_map(u16::to_le_bytes).collect()
}

/// Strips trailing NULs and decodes.
fn registry_string(units: &[u16]) -> String {
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
    String::from_utf16_lossy(&units[..end])
}

/// Splits REG_MULTI_SZ data into its items, using the data length rather
/// than the first empty item to find the end, so empty items survive.
///
/// Layout written by [`encode`]: each item NUL-terminated, then one more NUL.
/// `[]` is a lone NUL and `[""]` is two NULs.  Other writers often store an
/// empty list as two NULs too; such data reads back as `[""]`.  A missing
/// final terminator is tolerated.
fn multi_string(units: &[u16]) -> Vec<String> {
    let body = match units {
        [] | [0] => return Vec::new(),
        [.., 0, 0] => &units[..units.len() - 1],
        _ => units,
    };
    let mut items: Vec<&[u16]> = body.split(|&u| u == 0).collect();
    if body.last() == Some(&0) {
        items.pop();
    }
    items.into_iter().map(String::from_utf16_lossy).collect()
}

fn fixed<const N: usize>(data: &[u8], kind: &str) -> Result<[u8; N], StoreError> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| unreadable(format!("{kind} value shorter than {N} bytes")))
}

fn decode(kind: REG_VALUE_TYPE, data: &[u8]) -> Result<RawValue, StoreError> {
    match kind {
        REG_DWORD => Ok(RawValue::Dword(u32::from_le_bytes(fixed(data, "REG_DWORD")?))),
        REG_QWORD => Ok(RawValue::Qword(u64::from_le_bytes(fixed(data, "REG_QWORD")?))),
        REG_SZ => Ok(RawValue::String(registry_string(&utf16_units(data, "REG_SZ")?))),
        REG_EXPAND_SZ => Ok(RawValue::ExpandString(registry_string(&utf16_units(
            data,
            "REG_EXPAND_SZ",
        )?))),
        REG_MULTI_SZ => Ok(RawValue::MultiString(multi_string(&utf16_units(
            data,
            "REG_MULTI_SZ",
        )?))),
        REG_BINARY => Ok(RawValue::Binary(data.to_vec())),
        other => Err(unreadable(format!("registry value type {}", other.0))),
    }
}

fn encode(value: &RawValue) -> (REG_VALUE_TYPE, Vec<u8>) {
    match value {
        RawValue::Dword(v) => (REG_DWORD, v.to_le_bytes().to_vec()),
        RawValue::Qword(v) => (REG_QWORD, v.to_le_bytes().to_vec()),
        RawValue::String(s) => (REG_SZ, utf16_bytes(wide(s))),
        RawValue::ExpandString(s) => (REG_EXPAND_SZ, utf16_bytes(wide(s))),
        RawValue::MultiString(items) => {
            let units = items
                .iter()
                .flat_map(|item| item.encode_utf16().chain(iter::once(0)))
                .chain(iter::once(0));
            (REG_MULTI_SZ, utf16_bytes(units))
        }
        RawValue::Binary(bytes) => (REG_BINARY, bytes.clone()),
    }
}
