use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{DynpatchError, io_error_with_path};
use crate::report::{AppliedPatch, DUMP_PREFIX_LEN, hex_prefix};

pub const IMAGE_BASE: u32 = 0x0040_0000;

#[allow(clippy::missing_errors_doc)]
pub fn file_offset_for(virtual_addr: u32) -> Result<usize, DynpatchError> {
    let rva = virtual_addr
        .checked_sub(IMAGE_BASE)
        .ok_or(DynpatchError::AddressUnderflow {
            virtual_addr,
            image_base: IMAGE_BASE,
        })?;
    Ok(rva as usize)
}

#[derive(Debug)]
pub struct ExeImage {
    data: Vec<u8>,
    applied: Vec<AppliedPatch>,
}

impl ExeImage {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            applied: Vec::new(),
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn load(path: &Path) -> Result<Self, DynpatchError> {
        let data = fs::read(path).map_err(|err| io_error_with_path(&err, path))?;
        tracing::debug!(path = %path.display(), len = data.len(), "binary loaded");
        Ok(Self::from_bytes(data))
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn save(&self, path: &Path) -> Result<(), DynpatchError> {
        let mut file = fs::File::create(path).map_err(|err| io_error_with_path(&err, path))?;
        file.write_all(self.data.as_slice())
            .and_then(|()| file.flush())
            .map_err(|err| io_error_with_path(&err, path))?;
        tracing::debug!(path = %path.display(), len = self.data.len(), "binary saved");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn applied(&self) -> &[AppliedPatch] {
        self.applied.as_slice()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn apply_patch(
        &mut self,
        virtual_addr: u32,
        patch: &[u8],
        description: &str,
    ) -> Result<AppliedPatch, DynpatchError> {
        let file_offset = file_offset_for(virtual_addr)?;
        let end = match file_offset.checked_add(patch.len()) {
            Some(end) if end <= self.data.len() => end,
            _ => {
                return Err(DynpatchError::PatchOutOfBounds {
                    virtual_addr,
                    file_offset,
                    size: patch.len(),
                    image_len: self.data.len(),
                });
            }
        };

        let original_prefix = hex_prefix(&self.data[file_offset..end], DUMP_PREFIX_LEN);
        self.data[file_offset..end].copy_from_slice(patch);
        let patched_prefix = hex_prefix(&self.data[file_offset..end], DUMP_PREFIX_LEN);

        tracing::debug!(virtual_addr, file_offset, size = patch.len(), "patch applied");

        let entry = AppliedPatch {
            description: description.to_string(),
            virtual_addr,
            file_offset,
            size: patch.len(),
            original_prefix,
            patched_prefix,
        };
        self.applied.push(entry.clone());
        Ok(entry)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn verify_original_bytes(
        &self,
        virtual_addr: u32,
        expected: &[u8],
    ) -> Result<bool, DynpatchError> {
        let file_offset = file_offset_for(virtual_addr)?;
        let window = file_offset
            .checked_add(expected.len())
            .and_then(|end| self.data.get(file_offset..end));
        let Some(actual) = window else {
            tracing::warn!(virtual_addr, len = expected.len(), "预期字节窗口超出文件范围");
            return Ok(false);
        };
        if actual != expected {
            tracing::warn!(
                virtual_addr,
                expected = %hex_prefix(expected, DUMP_PREFIX_LEN),
                found = %hex_prefix(actual, DUMP_PREFIX_LEN),
                "原始字节与预期不符"
            );
            return Ok(false);
        }
        Ok(true)
    }
}
