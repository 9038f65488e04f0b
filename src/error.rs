use std::io;
use std::path::Path;

#[doc = "dynpatch 的统一错误类型。"]
#[derive(thiserror::Error, Debug)]
pub enum DynpatchError {
    #[doc = "补丁写入越界。"]
    #[error(
        "补丁越界: virtual_addr=0x{virtual_addr:08x} file_offset=0x{file_offset:x} size={size} 文件长度={image_len}"
    )]
    PatchOutOfBounds {
        virtual_addr: u32,
        file_offset: usize,
        size: usize,
        image_len: usize,
    },

    #[doc = "虚拟地址低于 image base。"]
    #[error("虚拟地址 0x{virtual_addr:08x} 低于 image base 0x{image_base:08x}")]
    AddressUnderflow { virtual_addr: u32, image_base: u32 },

    #[doc = "结构解析或序列化错误。"]
    #[error("格式错误: {message}")]
    FormatError { message: String },

    #[doc = "IO 错误。"]
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[doc = "配置错误。"]
    #[error("配置错误: {message}")]
    ConfigError { message: String },
}

impl From<serde_json::Error> for DynpatchError {
    fn from(err: serde_json::Error) -> Self {
        DynpatchError::FormatError {
            message: format!("序列化 JSON 失败: {err}"),
        }
    }
}

pub fn io_error_with_path(err: &io::Error, path: &Path) -> DynpatchError {
    DynpatchError::IoError(io::Error::new(
        err.kind(),
        format!("{}: {}", path.display(), err),
    ))
}
