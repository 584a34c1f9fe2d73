#![allow(dead_code)]

use symtab_core::backends::reader::{Arch, ObjectFile, RawSymbol};

pub const SAVE: u32 = 0x9de3_bfa0; // save %sp, -96, %sp
pub const NOP: u32 = 0x0100_0000;
pub const RET: u32 = 0x81c7_e008; // jmpl %i7+8, %g0
pub const RET_AGGREGATE: u32 = 0x81c7_e00c; // jmpl %i7+12, %g0
pub const RETL: u32 = 0x81c3_e008; // jmpl %o7+8, %g0
pub const RESTORE: u32 = 0x81e8_0000;
pub const CALL_G1: u32 = 0x9fc0_4000; // jmpl %g1, %o7
pub const CALL_CONST: u32 = 0x9fc0_2100; // jmpl %g0+0x100, %o7
pub const UNIMP_8: u32 = 0x0000_0008;
pub const BA: u32 = 0x1080_0002; // ba .+8

/// `call` from `from` to `to`.
pub fn call(from: u64, to: u64) -> u32 {
    0x4000_0000 | ((to.wrapping_sub(from) >> 2) as u32 & 0x3fff_ffff)
}

pub fn words_be(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// A small big-endian SPARC image.
///
/// ```text
/// 0x1000 main       (m.c)  direct, indirect, aggregate, constant-target and
///                          out-of-image calls, then ret/restore
/// 0x1040 foo        (m.c)  retl/nop
/// 0x1060 getstruct  (m.c)  aggregate-returning leaf
/// 0x1070 write             library routine, no module annotation
/// 0x3000 counter           data object
/// 0x3004 DYNINSTcount      runtime helper data
/// ```
pub fn sparc_object() -> ObjectFile {
    let mut code = vec![
        SAVE,                   // 0x1000
        call(0x1004, 0x1040),   // 0x1004 -> foo
        NOP,                    // 0x1008
        CALL_G1,                // 0x100c
        NOP,                    // 0x1010
        call(0x1014, 0x1060),   // 0x1014 -> getstruct
        NOP,                    // 0x1018
        UNIMP_8,                // 0x101c
        CALL_CONST,             // 0x1020
        NOP,                    // 0x1024
        call(0x1028, 0x1100),   // 0x1028 -> outside the image
        NOP,                    // 0x102c
        RET,                    // 0x1030
        RESTORE,                // 0x1034
        NOP,                    // 0x1038
        NOP,                    // 0x103c
        RETL,                   // 0x1040 foo
        NOP,                    // 0x1044
    ];
    code.resize(8 * 3, NOP); // pad to 0x1060
    code.extend([SAVE, RET_AGGREGATE, RESTORE, NOP]); // 0x1060 getstruct
    code.extend([RETL, NOP, NOP, NOP]); // 0x1070 write

    ObjectFile {
        arch: Arch::Sparc,
        little_endian: false,
        code_base: 0x1000,
        code: words_be(&code),
        data_base: 0x3000,
        data: vec![0; 16],
        symbols: vec![
            RawSymbol::function("main", 0x1000, 0).in_module("src/m.c"),
            RawSymbol::function("foo", 0x1040, 0).in_module("src/m.c"),
            RawSymbol::function("getstruct", 0x1060, 0x10).in_module("src/m.c"),
            RawSymbol::function("write", 0x1070, 0x10),
            RawSymbol::object("counter", 0x3000, 4),
            RawSymbol::object("DYNINSTcount", 0x3004, 4),
        ],
    }
}

/// An image with zeroed code at `[code_base, code_base + code_len)` and the
/// given symbols; no decoder is available for it.
pub fn synthetic_object(code_base: u64, code_len: usize, symbols: Vec<RawSymbol>) -> ObjectFile {
    ObjectFile {
        arch: Arch::Unknown,
        little_endian: true,
        code_base,
        code: vec![0; code_len],
        data_base: 0,
        data: Vec::new(),
        symbols,
    }
}

/// `a` in `lib/m.c` and `b` in `m.c`: two modules sharing the file name
/// `m.c`, with the nested one created first.
pub fn shadowed_file_name_object() -> ObjectFile {
    synthetic_object(
        0x1000,
        0x100,
        vec![
            RawSymbol::function("a", 0x1000, 0x10).in_module("lib/m.c"),
            RawSymbol::function("b", 0x1010, 0x10).in_module("m.c"),
        ],
    )
}
