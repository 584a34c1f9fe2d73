use std::collections::HashMap;
use std::fs;
use std::path::Path;

use goblin::elf::section_header::{SectionHeader, SHF_EXECINSTR, SHN_ABS, SHN_UNDEF, SHT_NOBITS};
use goblin::elf::sym::{self, Symtab};
use goblin::elf::{header, Elf};
use goblin::strtab::Strtab;

use super::{Arch, ObjectFile, ObjectReader, RawSymbol, SymbolKind};
use crate::error::SymtabError;

/// Widest code span (lowest to highest executable byte) accepted.
const MAX_CODE_SPAN: u64 = 1 << 30;

/// Object reader for ELF executables, shared objects and relocatable objects.
///
/// Code spans every executable section (`.init`, `.plt`, `.text`, `.fini`
/// and friends), with gaps between them zero-filled. Data is `.data`.
/// Relocatable objects carry no load addresses: their executable sections are
/// packed one after another starting at the first one's file offset, and
/// `.data` goes at its file offset or just past the code, whichever is later.
/// Code and data stay disjoint and symbol addresses unique.
///
/// The static symbol table is read when it names anything; otherwise the
/// dynamic one is.
pub struct ElfReader;

/// Where placed sections landed in the image's address space.
struct Layout {
    relocatable: bool,
    bases: HashMap<usize, u64>,
}

impl Layout {
    /// Amount added to `st_value` for a symbol defined in section `shndx`.
    fn symbol_base(&self, elf: &Elf, shndx: usize) -> u64 {
        if !self.relocatable || shndx == SHN_ABS as usize {
            return 0;
        }
        self.bases
            .get(&shndx)
            .copied()
            .or_else(|| elf.section_headers.get(shndx).map(|sh| sh.sh_offset))
            .unwrap_or(0)
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    let align = align.max(1);
    value.div_ceil(align).saturating_mul(align)
}

fn arch_from_machine(machine: u16) -> Arch {
    match machine {
        header::EM_SPARC | header::EM_SPARC32PLUS | header::EM_SPARCV9 => Arch::Sparc,
        header::EM_386 => Arch::X86,
        header::EM_X86_64 => Arch::X86_64,
        header::EM_ARM => Arch::Arm,
        header::EM_AARCH64 => Arch::Arm64,
        _ => Arch::Unknown,
    }
}

fn section_bytes(bytes: &[u8], sh: &SectionHeader) -> Option<Vec<u8>> {
    let start = usize::try_from(sh.sh_offset).ok()?;
    let len = usize::try_from(sh.sh_size).ok()?;
    bytes.get(start..start.checked_add(len)?).map(<[u8]>::to_vec)
}

fn is_code_section(sh: &SectionHeader) -> bool {
    sh.sh_flags & u64::from(SHF_EXECINSTR) != 0 && sh.sh_type != SHT_NOBITS && sh.sh_size > 0
}

fn parse_error(path: &Path, reason: impl Into<String>) -> SymtabError {
    SymtabError::Parse { path: path.to_path_buf(), reason: reason.into() }
}

/// Lay out every executable section and join them into one code buffer.
/// Returns the code base and bytes.
fn layout_code(
    path: &Path,
    bytes: &[u8],
    elf: &Elf,
    layout: &mut Layout,
) -> Result<(u64, Vec<u8>), SymtabError> {
    let mut placed: Vec<(u64, Vec<u8>)> = Vec::new();
    let mut cursor: Option<u64> = None;
    for (index, sh) in elf.section_headers.iter().enumerate().filter(|(_, sh)| is_code_section(sh)) {
        let name = elf.shdr_strtab.get_at(sh.sh_name).unwrap_or("?");
        let body = section_bytes(bytes, sh)
            .ok_or_else(|| parse_error(path, format!("{name} extends past end of file")))?;
        let base = match (layout.relocatable, cursor) {
            (false, _) => sh.sh_addr,
            (true, None) => sh.sh_offset,
            (true, Some(end)) => align_up(end, sh.sh_addralign),
        };
        cursor = Some(base.saturating_add(body.len() as u64));
        layout.bases.insert(index, base);
        placed.push((base, body));
    }

    let (Some(code_base), Some(code_end)) = (
        placed.iter().map(|(base, _)| *base).min(),
        placed.iter().map(|(base, body)| base.saturating_add(body.len() as u64)).max(),
    ) else {
        return Err(parse_error(path, "no executable section"));
    };
    if code_end - code_base > MAX_CODE_SPAN {
        return Err(parse_error(
            path,
            format!("executable sections span {:#x} bytes", code_end - code_base),
        ));
    }

    let mut code = vec![0u8; (code_end - code_base) as usize];
    for (base, body) in &placed {
        let at = (base - code_base) as usize;
        code[at..at + body.len()].copy_from_slice(body);
    }
    Ok((code_base, code))
}

/// Walk a symbol table in order. Local symbols that follow an `STT_FILE`
/// entry are annotated with that file name.
fn collect_symbols(elf: &Elf, syms: &Symtab, strtab: &Strtab, layout: &Layout) -> Vec<RawSymbol> {
    let mut symbols = Vec::new();
    let mut current_file: Option<String> = None;

    for s in syms.iter() {
        let name = strtab.get_at(s.st_name).unwrap_or("");
        if s.st_type() == sym::STT_FILE {
            current_file = (!name.is_empty()).then(|| name.to_string());
            continue;
        }
        if name.is_empty() || s.st_shndx == SHN_UNDEF as usize {
            continue;
        }
        let kind = match s.st_type() {
            sym::STT_FUNC => SymbolKind::Function,
            sym::STT_OBJECT => SymbolKind::Object,
            _ => SymbolKind::Other,
        };
        let base = layout.symbol_base(elf, s.st_shndx);
        let module = if s.st_bind() == sym::STB_LOCAL { current_file.clone() } else { None };
        symbols.push(RawSymbol {
            name: name.to_string(),
            address: base.wrapping_add(s.st_value),
            size: s.st_size,
            kind,
            module,
        });
    }
    symbols
}

impl ElfReader {
    /// Decode an in-memory ELF file.
    pub fn parse_bytes(path: &Path, bytes: &[u8]) -> Result<ObjectFile, SymtabError> {
        let elf = Elf::parse(bytes).map_err(|e| parse_error(path, e.to_string()))?;
        let mut layout =
            Layout { relocatable: elf.header.e_type == header::ET_REL, bases: HashMap::new() };
        let (code_base, code) = layout_code(path, bytes, &elf, &mut layout)?;
        let code_end = code_base + code.len() as u64;

        let (data_base, data) = match elf
            .section_headers
            .iter()
            .enumerate()
            .find(|(_, sh)| elf.shdr_strtab.get_at(sh.sh_name) == Some(".data"))
        {
            Some((index, sh)) => {
                let base = if layout.relocatable {
                    // Code is addressed in whole words.
                    sh.sh_offset.max(align_up(code_end, sh.sh_addralign.max(4)))
                } else {
                    sh.sh_addr
                };
                layout.bases.insert(index, base);
                (base, section_bytes(bytes, sh).unwrap_or_default())
            }
            None => (0, Vec::new()),
        };

        let mut symbols = collect_symbols(&elf, &elf.syms, &elf.strtab, &layout);
        if symbols.is_empty() {
            log::debug!("{}: no static symbols, reading the dynamic symbol table", path.display());
            symbols = collect_symbols(&elf, &elf.dynsyms, &elf.dynstrtab, &layout);
        }
        if symbols.is_empty() {
            return Err(SymtabError::NoSymbols(path.to_path_buf()));
        }

        Ok(ObjectFile {
            arch: arch_from_machine(elf.header.e_machine),
            little_endian: elf.little_endian,
            code_base,
            code,
            data_base,
            data,
            symbols,
        })
    }
}

impl ObjectReader for ElfReader {
    fn read(&self, path: &Path) -> Result<ObjectFile, SymtabError> {
        let bytes = fs::read(path)
            .map_err(|source| SymtabError::Io { path: path.to_path_buf(), source })?;
        Self::parse_bytes(path, &bytes)
    }

    fn name(&self) -> &'static str {
        "elf"
    }
}
