pub const LOOP_PATCH_VA: u32 = 0x0053_3c5b;
pub const REGION_END_VA: u32 = 0x0053_3e10;
pub const NOP: u8 = 0x90;
pub const PATCH_REGION_LEN: usize = (REGION_END_VA - LOOP_PATCH_VA) as usize;

#[derive(Debug, Clone)]
pub struct Patch {
    pub virtual_addr: u32,
    pub bytes: Vec<u8>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct PatchSet {
    pub name: &'static str,
    pub summary: &'static str,
    pub patches: Vec<Patch>,
}

pub fn dynamic_loop_code() -> Vec<u8> {
    vec![
        0x8b, 0x13, // mov edx, [ebx]
        0x8b, 0x4a, 0xf0, // mov ecx, [edx - 0x10]
        0x33, 0xf6, // xor esi, esi
        0x8d, 0x43, 0x04, // lea eax, [ebx + 0x4]
        0x3b, 0xf1, // cmp esi, ecx
        0x0f, 0x8d, 0xa3, 0x01, 0x00, 0x00, // jge 0x533e10
        0x8b, 0x13, // mov edx, [ebx]
        0x51, // push ecx
        0x8b, 0xce, // mov ecx, esi
        0x69, 0xc9, 0x20, 0x20, 0x00, 0x00, // imul ecx, ecx, 0x2020
        0x03, 0xca, // add ecx, edx
        0x8d, 0xb9, 0xa0, 0x00, 0x00, 0x00, // lea edi, [ecx + 0xa0]
        0xff, 0x43, 0x14, // inc dword [ebx + 0x14]
        0x89, 0x4f, 0x0c, // mov [edi + 0xc], ecx
        0x89, 0x07, // mov [edi], eax
        0x89, 0x47, 0x04, // mov [edi + 0x4], eax
        0x8b, 0x50, 0x08, // mov edx, [eax + 0x8]
        0x89, 0x57, 0x08, // mov [edi + 0x8], edx
        0x89, 0x78, 0x08, // mov [eax + 0x8], edi
        0x89, 0x7a, 0x04, // mov [edx + 0x4], edi
        0x59, // pop ecx
        0x46, // inc esi
        0xeb, 0xca, // jmp 0x533c65
    ]
}

pub fn nop_fill(count: usize) -> Vec<u8> {
    vec![NOP; count]
}

pub fn dynamic_loop_patch_set() -> PatchSet {
    let code = dynamic_loop_code();
    let nop_start = LOOP_PATCH_VA + code.len() as u32;
    let nop_count = (REGION_END_VA - nop_start) as usize;

    PatchSet {
        name: "Dynamic Loop Conversion",
        summary: "hardcoded ten-object initialization replaced by a loop driven by the stored element count; leftover bytes NOP filled",
        patches: vec![
            Patch {
                virtual_addr: LOOP_PATCH_VA,
                bytes: code,
                description: "Dynamic loop implementation".to_string(),
            },
            Patch {
                virtual_addr: nop_start,
                bytes: nop_fill(nop_count),
                description: format!("NOP fill ({nop_count} bytes)"),
            },
        ],
    }
}

pub fn patched_region_bytes() -> Vec<u8> {
    let set = dynamic_loop_patch_set();
    let mut region = Vec::with_capacity(PATCH_REGION_LEN);
    for patch in &set.patches {
        region.extend_from_slice(patch.bytes.as_slice());
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_code_is_64_bytes() {
        assert_eq!(dynamic_loop_code().len(), 64);
    }

    #[test]
    fn patch_set_tiles_region_exactly() {
        let set = dynamic_loop_patch_set();
        assert_eq!(set.patches.len(), 2);
        assert_eq!(set.patches[0].virtual_addr, LOOP_PATCH_VA);

        let total: usize = set.patches.iter().map(|patch| patch.bytes.len()).sum();
        assert_eq!(total, PATCH_REGION_LEN);

        let code_len = set.patches[0].bytes.len() as u32;
        assert_eq!(set.patches[1].virtual_addr, LOOP_PATCH_VA + code_len);
        assert!(set.patches[1].bytes.iter().all(|b| *b == NOP));
    }

    #[test]
    fn exit_jump_lands_at_region_end() {
        let code = dynamic_loop_code();
        assert_eq!(&code[12..14], &[0x0f, 0x8d]);
        let disp = i32::from_le_bytes(code[14..18].try_into().unwrap());
        let next_instruction = LOOP_PATCH_VA + 12 + 6;
        assert_eq!(next_instruction.wrapping_add_signed(disp), REGION_END_VA);
    }

    #[test]
    fn back_jump_returns_to_loop_head() {
        let code = dynamic_loop_code();
        assert_eq!(code[62], 0xeb);
        let disp = i32::from(code[63] as i8);
        let next_instruction = LOOP_PATCH_VA + 62 + 2;
        assert_eq!(next_instruction.wrapping_add_signed(disp), LOOP_PATCH_VA + 10);
    }

    #[test]
    fn patched_region_bytes_matches_set_order() {
        let region = patched_region_bytes();
        assert_eq!(region.len(), PATCH_REGION_LEN);
        assert_eq!(&region[..64], dynamic_loop_code().as_slice());
        assert!(region[64..].iter().all(|b| *b == NOP));
    }
}
