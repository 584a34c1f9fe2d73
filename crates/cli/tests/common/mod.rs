#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::write::{Object, SectionId, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

// push rbp; call callee; call rax; pop rbp; ret
pub const CALLER: [u8; 10] = [0x55, 0xe8, 0x04, 0x00, 0x00, 0x00, 0xff, 0xd0, 0x5d, 0xc3];

fn symbol(name: &str, value: u64, size: u64, kind: SymbolKind, scope: SymbolScope, section: SectionId) -> Symbol {
    Symbol {
        name: name.as_bytes().to_vec(),
        value,
        size,
        kind,
        scope,
        weak: false,
        section: SymbolSection::Section(section),
        flags: SymbolFlags::None,
    }
}

/// Relocatable x86-64 object with a global `caller` (calls `callee` and
/// `rax`), a file-local `callee` in `fixture.c`, a library `write`, and a
/// `DYNINSTflag` data word.
pub fn write_fixture(dir: &Path) -> PathBuf {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).append_data(&CALLER, 16);
    obj.section_mut(text).append_data(&[0xc3], 1); // callee
    obj.section_mut(text).append_data(&[0xc3], 1); // write
    let data = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
    obj.section_mut(data).append_data(&[0u8; 8], 8);

    obj.add_file_symbol(b"fixture.c".to_vec());
    obj.add_symbol(symbol("callee", 10, 1, SymbolKind::Text, SymbolScope::Compilation, text));
    obj.add_symbol(symbol("caller", 0, 10, SymbolKind::Text, SymbolScope::Linkage, text));
    obj.add_symbol(symbol("write", 11, 1, SymbolKind::Text, SymbolScope::Linkage, text));
    obj.add_symbol(symbol("DYNINSTflag", 0, 4, SymbolKind::Data, SymbolScope::Linkage, data));

    let path = dir.join("fixture.o");
    std::fs::write(&path, obj.write().unwrap()).unwrap();
    path
}

pub fn symtab() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("symtab")
}
