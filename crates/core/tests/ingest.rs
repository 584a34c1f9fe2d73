mod common;

use symtab_core::backends::reader::RawSymbol;
use symtab_core::model::{DYN_MODULE, EXTRA_MODULE, LIBRARY_MODULE, USER_MODULE};
use symtab_core::{
    AddrRange, Image, IngestError, RequiredSymbol, SymtabConfig, SymtabError, Tags,
};

use common::{shadowed_file_name_object, sparc_object, synthetic_object};

#[test]
fn unannotated_function_outside_ranges_lands_in_library_module() {
    let object = synthetic_object(0x1000, 0x1000, vec![RawSymbol::function("foo", 0x1000, 0x40)]);
    let config = SymtabConfig {
        runtime_range: Some(AddrRange::new(0x3000, 0x4000)),
        ..SymtabConfig::default()
    };
    let image = Image::from_object("prog", object, &config).unwrap();

    let foo = image.find_function_at(0x1000).expect("foo by address");
    assert_eq!(foo.sym_tab_name(), "foo");
    assert_eq!(image.module(foo.file()).full_name(), LIBRARY_MODULE);
    assert_eq!(image.find_functions("foo").len(), 1);
    assert_eq!(image.find_one_function("foo").map(|f| f.addr()), Some(0x1000));
}

#[test]
fn same_name_functions_in_one_module_are_siblings() {
    let object = synthetic_object(
        0x1000,
        0x1000,
        vec![
            RawSymbol::function("bar", 0x1000, 0x20).in_module("m.c"),
            RawSymbol::function("bar", 0x1080, 0x20).in_module("m.c"),
        ],
    );
    let image = Image::from_object("prog", object, &SymtabConfig::default()).unwrap();

    let module = image.find_module("m.c").expect("module m.c");
    assert_eq!(module.len(), 2);
    assert_eq!(module.addr(), 0x1000);

    let all = image.find_functions("bar");
    assert_eq!(all.len(), 2);
    assert_eq!(image.find_function_at(0x1080).map(|f| f.addr()), Some(0x1080));

    let first = image.find_module_function("m.c", "bar").expect("first bar");
    assert_eq!(first.addr(), 0x1000);
    let chain: Vec<u64> = image.siblings(first.id()).map(|f| f.addr()).collect();
    assert_eq!(chain, vec![0x1000, 0x1080]);
}

#[test]
fn placement_order_runtime_then_user_then_data() {
    let mut object = synthetic_object(
        0x1000,
        0x1000,
        vec![
            RawSymbol::function("rt_helper", 0x1100, 0),
            RawSymbol::function("user_fn", 0x1800, 0),
            RawSymbol::function("annotated", 0x1110, 0).in_module("src/lib.f"),
            RawSymbol::function("in_data", 0x4000, 0),
            RawSymbol::function("other", 0x1f00, 0),
        ],
    );
    object.data_base = 0x4000;
    object.data = vec![0; 16];
    let config = SymtabConfig {
        runtime_range: Some(AddrRange::new(0x1100, 0x1200)),
        user_range: Some(AddrRange::new(0x1000, 0x1900)),
        ..SymtabConfig::default()
    };
    let image = Image::from_object("prog", object, &config).unwrap();

    let module_of = |name: &str| {
        let func = image.find_one_function(name).unwrap();
        image.module(func.file()).full_name().to_string()
    };
    assert_eq!(module_of("rt_helper"), DYN_MODULE);
    assert_eq!(module_of("user_fn"), USER_MODULE);
    assert_eq!(module_of("annotated"), "src/lib.f");
    assert_eq!(module_of("in_data"), EXTRA_MODULE);
    assert_eq!(module_of("other"), LIBRARY_MODULE);

    let annotated = image.find_module("lib.f").unwrap();
    assert_eq!(annotated.language(), symtab_core::model::Language::Fortran);
}

#[test]
fn catalog_tags_do_not_decide_placement() {
    let object = synthetic_object(
        0x1000,
        0x100,
        vec![
            RawSymbol::function("write", 0x1000, 0).in_module("io.c"),
            RawSymbol::function("recv", 0x1010, 0),
            RawSymbol::function("compute", 0x1020, 0).in_module("io.c"),
        ],
    );
    let image = Image::from_object("prog", object, &SymtabConfig::default()).unwrap();

    let write = image.find_one_function("write").unwrap();
    assert_eq!(image.module(write.file()).file_name(), "io.c");
    assert!(write.is_lib_tag());
    assert!(write.is_tag_similar(Tags::IO_OUT));

    let recv = image.find_one_function("recv").unwrap();
    assert_eq!(image.module(recv.file()).full_name(), LIBRARY_MODULE);
    assert_eq!(recv.tags(), Tags::LIB_FUNC | Tags::MSG_RECV | Tags::CPU_STATE);

    let compute = image.find_one_function("compute").unwrap();
    assert_eq!(compute.tags(), Tags::NONE);
}

#[test]
fn bad_records_are_skipped_and_reported() {
    let object = synthetic_object(
        0x1000,
        0x100,
        vec![
            RawSymbol::function("", 0x1000, 0),
            RawSymbol::function("wild", 0x9000, 0),
            RawSymbol::function("blank_module", 0x1008, 0).in_module("  "),
            RawSymbol::function("good", 0x1010, 0),
        ],
    );
    let image = Image::from_object("prog", object, &SymtabConfig::default()).unwrap();

    assert_eq!(image.functions().len(), 1);
    let report = image.ingest_report();
    assert_eq!(report.functions, 1);
    assert!(report.had_errors());
    assert_eq!(
        report.skipped,
        vec![
            IngestError::EmptyName { address: 0x1000 },
            IngestError::InvalidAddress { name: "wild".into(), address: 0x9000 },
            IngestError::UnresolvedModule { name: "blank_module".into(), module: "  ".into() },
        ]
    );
    assert!(image.find_function_at(0x9000).is_none());
}

#[test]
fn alias_at_existing_address_keeps_first_definition() {
    let object = synthetic_object(
        0x1000,
        0x100,
        vec![
            RawSymbol::function("memcpy", 0x1000, 0),
            RawSymbol::function("__memcpy_alias", 0x1000, 0).in_module("alias.c"),
        ],
    );
    let image = Image::from_object("prog", object, &SymtabConfig::default()).unwrap();

    assert_eq!(image.functions().len(), 1);
    assert_eq!(image.find_function_at(0x1000).unwrap().sym_tab_name(), "memcpy");
    assert!(image.find_module("alias.c").is_none(), "no module is created for a dropped alias");
    assert!(image.symbol_exists("__memcpy_alias"));
}

#[test]
fn image_without_functions_is_an_error() {
    let object = synthetic_object(0x1000, 0x100, vec![RawSymbol::object("table", 0x1000, 4)]);
    let err = Image::from_object("prog", object, &SymtabConfig::default()).unwrap_err();
    assert!(matches!(err, SymtabError::NoFunctions(_)));
}

#[test]
fn heap_check_reports_missing_and_overrunning_symbols() {
    let config = SymtabConfig {
        required_symbols: vec![RequiredSymbol { name: "counter".into(), must_exist: true }],
        ..SymtabConfig::default()
    };
    let image = Image::from_object("a.out", sparc_object(), &config).unwrap();
    assert!(image.ingest_report().heap_ok);

    let config = SymtabConfig {
        required_symbols: vec![
            RequiredSymbol { name: "DYNINSTheap".into(), must_exist: true },
            RequiredSymbol { name: "optional".into(), must_exist: false },
        ],
        ..SymtabConfig::default()
    };
    let image = Image::from_object("a.out", sparc_object(), &config).unwrap();
    assert!(!image.ingest_report().heap_ok);

    let mut object = sparc_object();
    object.symbols.push(RawSymbol::object("big", 0x3008, 64));
    let image = Image::from_object("a.out", object, &SymtabConfig::default()).unwrap();
    assert!(!image.ingest_report().heap_ok, "object running past the data segment");
}

#[test]
fn internal_symbols_are_collected_by_prefix() {
    let image = Image::from_object("a.out", sparc_object(), &SymtabConfig::default()).unwrap();

    assert_eq!(image.internal_symbols().len(), 1);
    let sym = image.find_internal_symbol("DYNINSTcount", false).expect("runtime helper");
    assert_eq!(sym.addr(), 0x3004);
    assert_eq!(image.find_internal_address("DYNINSTcount", true), Some(0x3004));
    assert_eq!(image.find_internal_address("DYNINSTmissing", false), None);
    assert!(image.find_one_function("DYNINSTcount").is_none(), "data symbols are not functions");

    let config = SymtabConfig { internal_prefixes: vec!["PARADYN".into()], ..SymtabConfig::default() };
    let image = Image::from_object("a.out", sparc_object(), &config).unwrap();
    assert!(image.internal_symbols().is_empty());
}

#[test]
fn demangled_names_are_indexed() {
    let object = synthetic_object(
        0x1000,
        0x100,
        vec![RawSymbol::function("_Z3addii", 0x1000, 0).in_module("add.cc")],
    );
    let image = Image::from_object("prog", object, &SymtabConfig::default()).unwrap();

    let func = image.find_one_function("_Z3addii").unwrap();
    assert_eq!(func.pretty_name(), "add(int, int)");
    assert_eq!(image.find_functions_by_pretty("add(int, int)").len(), 1);
    assert_eq!(image.find_module("add.cc").unwrap().language(), symtab_core::model::Language::CPlusPlus);
}

#[test]
fn every_function_belongs_to_exactly_one_module() {
    let image = Image::from_object("a.out", sparc_object(), &SymtabConfig::default()).unwrap();
    for func in image.functions_by_addr() {
        let owners: Vec<_> =
            image.modules().iter().filter(|m| m.functions().contains(&func.id())).collect();
        assert_eq!(owners.len(), 1, "{} owned {} times", func.sym_tab_name(), owners.len());
        assert_eq!(owners[0].id(), func.file());
    }
    let total: usize = image.modules().iter().map(|m| m.len()).sum();
    assert_eq!(total, image.functions().len());
}

#[test]
fn exact_module_name_wins_over_shared_file_name() {
    let mut image =
        Image::from_object("prog", shadowed_file_name_object(), &SymtabConfig::default()).unwrap();

    let exact = image.find_module("m.c").expect("module m.c");
    assert_eq!(exact.full_name(), "m.c");
    let b = image.find_one_function("b").unwrap().id();
    assert_eq!(exact.functions(), &[b]);
    assert_eq!(image.find_module("lib/m.c").unwrap().full_name(), "lib/m.c");

    let exact = exact.id();
    assert_eq!(image.change_module_lib_flag(exact, true), 1);
    assert!(image.find_one_function("b").unwrap().is_lib_tag());
    assert!(!image.find_one_function("a").unwrap().is_lib_tag());
}

#[test]
fn handles_from_another_image_are_rejected() {
    let small = Image::from_object(
        "small",
        synthetic_object(0x1000, 0x100, vec![RawSymbol::function("only", 0x1000, 0).in_module("s.c")]),
        &SymtabConfig::default(),
    )
    .unwrap();
    let large = Image::from_object("a.out", sparc_object(), &SymtabConfig::default()).unwrap();

    let foreign_func = large.find_one_function("write").unwrap().id();
    let foreign_module = large.modules().last().unwrap().id();
    assert!(small.get_function(foreign_func).is_none());
    assert!(small.get_module(foreign_module).is_none());
    assert_eq!(small.get_function(small.functions()[0].id()).map(|f| f.sym_tab_name()), Some("only"));

    let mut small = small;
    small.check_call_points(foreign_func);
    small.check_all_call_points(foreign_module);
    assert_eq!(small.change_module_lib_flag(foreign_module, true), 0);
    assert!(!small.functions()[0].is_lib_tag());
}
