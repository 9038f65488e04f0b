use crate::error::DynpatchError;

const MIN_PE_LEN: usize = 0x100;
const PE32_MAGIC: u16 = 0x10b;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeFingerprint {
    pub image_base: u32,
    pub size_of_image: u32,
    pub time_date_stamp: u32,
    pub number_of_sections: u16,
    pub section_names: Vec<[u8; 8]>,
}

impl PeFingerprint {
    pub fn section_names_lossy(&self) -> Vec<String> {
        self.section_names
            .iter()
            .map(|name| {
                let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
                String::from_utf8_lossy(&name[..end]).into_owned()
            })
            .collect()
    }
}

#[allow(clippy::missing_errors_doc)]
pub fn parse_pe_fingerprint(bytes: &[u8]) -> Result<PeFingerprint, DynpatchError> {
    if bytes.len() < MIN_PE_LEN {
        return Err(format_error("PE 文件长度不足"));
    }
    if bytes.get(0..2) != Some(b"MZ") {
        return Err(format_error("缺少 MZ header"));
    }

    let pe_off = read_u32_le(bytes, 0x3c)? as usize;
    let pe_sig = bytes
        .get(pe_off..pe_off.saturating_add(4))
        .ok_or_else(|| format_error("PE header 越界"))?;
    if pe_sig != b"PE\0\0" {
        return Err(format_error("PE signature 不匹配"));
    }

    let coff_off = pe_off + 4;
    let number_of_sections = read_u16_le(bytes, coff_off + 2)?;
    let time_date_stamp = read_u32_le(bytes, coff_off + 4)?;
    let size_of_optional_header = read_u16_le(bytes, coff_off + 16)? as usize;

    let opt_off = coff_off + 20;
    let opt = bytes
        .get(opt_off..opt_off + size_of_optional_header)
        .ok_or_else(|| format_error("Optional header 越界"))?;
    if opt.len() < 0x3c {
        return Err(format_error("Optional header 长度不足"));
    }

    let magic = read_u16_le(opt, 0)?;
    if magic != PE32_MAGIC {
        return Err(DynpatchError::FormatError {
            message: format!("不支持的 optional header magic 0x{magic:x}，仅支持 PE32"),
        });
    }

    let image_base = read_u32_le(opt, 0x1c)?;
    let size_of_image = read_u32_le(opt, 0x38)?;

    let sections_off = opt_off + size_of_optional_header;
    let section_table_len = usize::from(number_of_sections).saturating_mul(40);
    let section_table = bytes
        .get(sections_off..sections_off + section_table_len)
        .ok_or_else(|| format_error("Section table 越界"))?;
    let mut section_names: Vec<[u8; 8]> = Vec::with_capacity(number_of_sections.into());
    for i in 0..usize::from(number_of_sections) {
        let base = i.saturating_mul(40);
        let mut name = [0u8; 8];
        let src = section_table
            .get(base..base + 8)
            .ok_or_else(|| format_error("Section header 越界"))?;
        name.copy_from_slice(src);
        section_names.push(name);
    }

    Ok(PeFingerprint {
        image_base,
        size_of_image,
        time_date_stamp,
        number_of_sections,
        section_names,
    })
}

fn format_error(message: &str) -> DynpatchError {
    DynpatchError::FormatError {
        message: message.to_string(),
    }
}

fn read_u16_le(bytes: &[u8], off: usize) -> Result<u16, DynpatchError> {
    let b = bytes
        .get(off..off + 2)
        .ok_or_else(|| format_error("读取 u16 越界"))?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_le(bytes: &[u8], off: usize) -> Result<u32, DynpatchError> {
    let b = bytes
        .get(off..off + 4)
        .ok_or_else(|| format_error("读取 u32 越界"))?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}
