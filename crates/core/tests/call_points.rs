mod common;

use symtab_core::backends::decoder::{CallTarget, InsnClass, SparcDecoder};
use symtab_core::backends::reader::{Arch, ObjectFile, RawSymbol};
use symtab_core::{Image, PointKind, SymtabConfig};

use common::{call, sparc_object, synthetic_object, words_be, NOP, RESTORE, RET, RETL, SAVE};

fn sparc_image() -> Image {
    Image::from_object("a.out", sparc_object(), &SymtabConfig::default()).unwrap()
}

fn func_id(image: &Image, name: &str) -> symtab_core::FuncId {
    image.find_one_function(name).unwrap_or_else(|| panic!("{name} missing")).id()
}

#[test]
fn sparc_words_are_classified() {
    assert_eq!(
        SparcDecoder::classify(common::call(0x1004, 0x1040), 0x1004),
        InsnClass::Call(CallTarget::Direct(0x1040))
    );
    assert_eq!(
        SparcDecoder::classify(common::call(0x2000, 0x1000), 0x2000),
        InsnClass::Call(CallTarget::Direct(0x1000))
    );
    assert_eq!(SparcDecoder::classify(common::CALL_G1, 0), InsnClass::Call(CallTarget::Indirect));
    assert_eq!(SparcDecoder::classify(common::CALL_CONST, 0), InsnClass::Call(CallTarget::Unknown));
    assert_eq!(SparcDecoder::classify(common::RET, 0), InsnClass::Return);
    assert_eq!(SparcDecoder::classify(common::RETL, 0), InsnClass::Return);
    assert_eq!(SparcDecoder::classify(common::RET_AGGREGATE, 0), InsnClass::Return);
    assert_eq!(SparcDecoder::classify(common::UNIMP_8, 0), InsnClass::AggregateMarker);
    assert_eq!(SparcDecoder::classify(common::BA, 0), InsnClass::Branch);
    assert_eq!(SparcDecoder::classify(NOP, 0), InsnClass::Other);
    assert_eq!(SparcDecoder::classify(common::SAVE, 0), InsnClass::Other);
}

#[test]
fn points_are_unavailable_until_checked() {
    let image = sparc_image();
    let main = image.find_one_function("main").unwrap();
    assert!(!main.call_points_checked());
    assert!(main.func_entry().is_none());
    assert!(main.calls().is_empty());
    assert!(main.func_returns().is_empty());
}

#[test]
fn main_has_entry_returns_and_classified_calls() {
    let mut image = sparc_image();
    let main = func_id(&image, "main");
    image.check_call_points(main);

    let foo = func_id(&image, "foo");
    let getstruct = func_id(&image, "getstruct");
    let main = image.function(main);
    assert!(main.call_points_checked());

    let entry = main.func_entry().expect("entry point");
    assert_eq!(entry.kind, PointKind::Entry);
    assert_eq!(entry.addr, 0x1000);
    assert_eq!(entry.original.word(false), Some(common::SAVE));
    assert!(!entry.is_delayed);

    let ret = main.func_return().expect("return point");
    assert_eq!(main.func_returns().len(), 1);
    assert_eq!(ret.addr, 0x1030);
    assert!(ret.is_delayed);
    assert_eq!(ret.delay_slot.as_ref().and_then(|i| i.word(false)), Some(RESTORE));

    let calls = main.calls();
    let addrs: Vec<u64> = calls.iter().map(|p| p.addr).collect();
    assert_eq!(addrs, vec![0x1004, 0x100c, 0x1014, 0x1020, 0x1028]);
    assert!(calls.iter().all(|p| p.is_call() && p.func == main.id()));

    // Direct call to a known function, with its delay slot captured.
    assert_eq!(calls[0].callee, Some(foo));
    assert!(!calls[0].call_indirect);
    assert_eq!(calls[0].delay_slot.as_ref().map(|i| (i.addr, i.word(false))), Some((0x1008, Some(NOP))));
    assert!(!calls[0].call_aggregate);

    // Register-indirect call.
    assert!(calls[1].call_indirect);
    assert_eq!(calls[1].callee, None);

    // Call to an aggregate-returning function: `unimp` after the delay slot.
    assert_eq!(calls[2].callee, Some(getstruct));
    assert!(calls[2].call_aggregate);
    assert_eq!(calls[2].aggregate.as_ref().map(|i| i.addr), Some(0x101c));

    // Constant jmpl target is neither provably direct nor indirect.
    assert!(calls[3].call_indirect);

    // Direct call leaving the image.
    assert!(!calls[4].call_indirect);
    assert_eq!(calls[4].callee, None);
}

#[test]
fn leaf_entry_is_delayed_return() {
    let mut image = sparc_image();
    let foo = func_id(&image, "foo");
    image.check_call_points(foo);

    let foo = image.function(foo);
    let entry = foo.func_entry().unwrap();
    assert_eq!(entry.addr, 0x1040);
    assert!(entry.is_delayed);
    assert_eq!(foo.func_returns().len(), 1);
    assert!(foo.calls().is_empty());
}

#[test]
fn aggregate_return_is_recognized_within_declared_size() {
    let mut image = sparc_image();
    let getstruct = func_id(&image, "getstruct");
    image.check_call_points(getstruct);

    let returns = image.function(getstruct).func_returns();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].addr, 0x1064);
    assert_eq!(returns[0].original.word(false), Some(common::RET_AGGREGATE));
}

#[test]
fn discovery_runs_once() {
    let mut image = sparc_image();
    let main = func_id(&image, "main");
    image.check_call_points(main);
    let first = image.function(main).calls().to_vec();
    image.check_call_points(main);
    assert_eq!(image.function(main).calls(), first.as_slice());
}

#[test]
fn check_all_functions_covers_every_module() {
    let mut image = sparc_image();
    image.check_all_functions();
    assert!(image.functions().iter().all(|f| f.call_points_checked()));

    let write = image.find_one_function("write").unwrap();
    assert_eq!(write.func_entry().map(|p| p.addr), Some(0x1070));
}

#[test]
fn arch_override_selects_decoder() {
    let mut object = sparc_object();
    object.arch = symtab_core::backends::reader::Arch::Unknown;
    let config = SymtabConfig { arch: Some("sparc".into()), ..SymtabConfig::default() };
    let mut image = Image::from_object("a.out", object, &config).unwrap();
    assert_eq!(image.decoder().map(|d| d.name()), Some("sparc"));

    let main = func_id(&image, "main");
    image.check_call_points(main);
    assert_eq!(image.function(main).calls().len(), 5);
}

#[test]
fn unknown_arch_gets_raw_entry_only() {
    let object = synthetic_object(
        0x1000,
        0x40,
        vec![symtab_core::backends::reader::RawSymbol::function("f", 0x1000, 0x10)],
    );
    let mut image = Image::from_object("blob", object, &SymtabConfig::default()).unwrap();
    assert!(image.decoder().is_none());

    let f = func_id(&image, "f");
    image.check_call_points(f);
    let f = image.function(f);
    assert!(f.call_points_checked());
    assert_eq!(f.func_entry().map(|p| p.original.len()), Some(4));
    assert!(f.calls().is_empty());
}

#[test]
fn module_wide_check_is_idempotent() {
    let mut image = sparc_image();
    let module = image.find_module("m.c").unwrap().id();

    image.check_all_call_points(module);
    let snapshot: Vec<_> = image.module(module).functions().iter().map(|id| image.function(*id).calls().to_vec()).collect();
    image.check_all_call_points(module);
    let again: Vec<_> = image.module(module).functions().iter().map(|id| image.function(*id).calls().to_vec()).collect();

    assert_eq!(snapshot, again);
    assert_eq!(snapshot.iter().map(Vec::len).sum::<usize>(), 5);
    assert!(!image.find_one_function("write").unwrap().call_points_checked(), "other modules untouched");
}

#[test]
fn call_in_a_delay_slot_is_marked() {
    let object = ObjectFile {
        arch: Arch::Sparc,
        little_endian: false,
        code_base: 0x1000,
        code: words_be(&[
            SAVE,                 // 0x1000
            call(0x1004, 0x1020), // 0x1004
            call(0x1008, 0x1020), // 0x1008, in the slot of 0x1004
            NOP,                  // 0x100c
            RET,                  // 0x1010
            RESTORE,              // 0x1014
            NOP,                  // 0x1018
            NOP,                  // 0x101c
            RETL,                 // 0x1020 inner
            NOP,                  // 0x1024
        ]),
        data_base: 0x3000,
        data: vec![0; 4],
        symbols: vec![
            RawSymbol::function("outer", 0x1000, 0).in_module("d.c"),
            RawSymbol::function("inner", 0x1020, 0).in_module("d.c"),
        ],
    };
    let mut image = Image::from_object("d.out", object, &SymtabConfig::default()).unwrap();
    let outer = func_id(&image, "outer");
    let inner = func_id(&image, "inner");
    image.check_call_points(outer);
    let outer = image.function(outer);

    assert!(!outer.func_entry().unwrap().in_delay_slot);
    let calls = outer.calls();
    assert_eq!(calls.iter().map(|p| p.addr).collect::<Vec<_>>(), vec![0x1004, 0x1008]);
    assert!(!calls[0].in_delay_slot);
    assert_eq!(calls[0].delay_slot.as_ref().map(|i| i.addr), Some(0x1008));
    assert!(calls[1].in_delay_slot);
    assert!(calls[1].is_delayed);
    assert!(calls.iter().all(|p| p.callee == Some(inner)));

    let ret = outer.func_return().unwrap();
    assert_eq!(ret.addr, 0x1010);
    assert!(!ret.in_delay_slot);
}

#[cfg(feature = "capstone-backend")]
#[test]
fn endbr64_is_skipped_for_the_entry_point() {
    let mut code = vec![0xf3, 0x0f, 0x1e, 0xfa, 0x55, 0x5d, 0xc3]; // endbr64; push rbp; pop rbp; ret
    code.resize(0x10, 0x90);
    let object = ObjectFile {
        arch: Arch::X86_64,
        little_endian: true,
        code_base: 0x1000,
        code,
        data_base: 0,
        data: Vec::new(),
        symbols: vec![RawSymbol::function("guarded", 0x1000, 7).in_module("g.c")],
    };
    let mut image = Image::from_object("g.out", object, &SymtabConfig::default()).unwrap();
    let guarded = func_id(&image, "guarded");
    image.check_call_points(guarded);
    let guarded = image.function(guarded);

    let entry = guarded.func_entry().expect("entry point");
    assert_eq!(entry.addr, 0x1004);
    assert_eq!(entry.original.bytes, vec![0x55]);
    assert_eq!(guarded.func_return().map(|p| p.addr), Some(0x1006));
}
