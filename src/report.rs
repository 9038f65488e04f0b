use std::fmt::Write as _;

use serde::Serialize;

use crate::error::DynpatchError;

pub const DUMP_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct AppliedPatch {
    pub description: String,
    pub virtual_addr: u32,
    pub file_offset: usize,
    pub size: usize,
    pub original_prefix: String,
    pub patched_prefix: String,
}

pub fn hex_prefix(bytes: &[u8], max_len: usize) -> String {
    let take = bytes.len().min(max_len);
    let mut out = String::new();
    for (i, b) in bytes.iter().take(take).enumerate() {
        if i != 0 {
            out.push(' ');
        }
        if write!(&mut out, "{b:02x}").is_err() {
            break;
        }
    }
    out
}

pub fn print_applied(patch: &AppliedPatch) {
    println!("applying patch: {}", patch.description);
    println!(
        "  virtual_addr=0x{:08x} file_offset=0x{:08x} size={}",
        patch.virtual_addr, patch.file_offset, patch.size
    );
    println!("  original: {}", patch.original_prefix);
    println!("  patched:  {}", patch.patched_prefix);
}

pub fn print_summary(applied: &[AppliedPatch]) {
    println!("patch summary: {} patches applied", applied.len());
    for (i, patch) in applied.iter().enumerate() {
        println!(
            "  {}. {} virtual_addr=0x{:08x} file_offset=0x{:08x} size={}",
            i + 1,
            patch.description,
            patch.virtual_addr,
            patch.file_offset,
            patch.size
        );
    }
}

#[allow(clippy::missing_errors_doc)]
pub fn summary_json(applied: &[AppliedPatch]) -> Result<String, DynpatchError> {
    serde_json::to_string_pretty(applied).map_err(DynpatchError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_prefix_spaces_and_truncates() {
        assert_eq!(hex_prefix(&[], 16), "");
        assert_eq!(hex_prefix(&[0x8b, 0x13], 16), "8b 13");
        assert_eq!(hex_prefix(&[0x01, 0x02, 0x03], 2), "01 02");
        assert_eq!(hex_prefix(&[0x90; 4], 16), "90 90 90 90");
    }

    #[test]
    fn summary_json_keeps_log_fields() -> Result<(), Box<dyn std::error::Error>> {
        let applied = vec![AppliedPatch {
            description: "Dynamic loop implementation".to_string(),
            virtual_addr: 0x0053_3c5b,
            file_offset: 0x13_3c5b,
            size: 64,
            original_prefix: "8b 13".to_string(),
            patched_prefix: "8b 13".to_string(),
        }];

        let json = summary_json(applied.as_slice())?;
        let value: serde_json::Value = serde_json::from_str(json.as_str())?;
        assert_eq!(value[0]["description"], "Dynamic loop implementation");
        assert_eq!(value[0]["virtual_addr"], 0x0053_3c5b);
        assert_eq!(value[0]["file_offset"], 0x13_3c5b);
        assert_eq!(value[0]["size"], 64);
        assert_eq!(value[0]["original_prefix"], "8b 13");
        Ok(())
    }
}
