#![no_main]
use libfuzzer_sys::fuzz_target;
use field_pack::*;

fn engine(kind: StrategyKind) -> Engine {
    let node = StructDef::new(
        "Node",
        vec![
            FieldDescriptor::new("id", FieldType::Int).tag(1).since(1),
            FieldDescriptor::new("name", FieldType::Str).tag(2).since(1),
            FieldDescriptor::new("next", FieldType::object("Node")).tag(3).since(1),
            FieldDescriptor::new("data", FieldType::object("long[]")).tag(4).since(2),
        ],
    );
    let mut engine = Engine::new(Config::new().default_strategy(kind));
    let _ = engine.register(&node);
    let _ = engine.register(ArrayKind::Longs);
    engine
}

fuzz_target!(|data: &[u8]| {
    let (&first, rest) = match data.split_first() {
        Some(split) => split,
        None => return,
    };
    let kind = match first % 4 {
        0 => StrategyKind::Plain,
        1 => StrategyKind::Compatible,
        2 => StrategyKind::Tagged,
        _ => StrategyKind::Versioned,
    };
    let mut engine = engine(kind);
    let mut input = Input::new(rest);
    let read = if first & 0x80 == 0 {
        engine.read_class_and_object(&mut input)
    } else {
        let ty = match engine.registry().get("Node") {
            Some(entry) => entry.type_desc().clone(),
            None => return,
        };
        engine.read_object(&mut input, &ty).map(Some)
    };
    // Decoded cycles would otherwise outlive the run
    if let Ok(Some(root)) = read {
        root.unlink_graph();
    }
});
