use super::*;

#[test]
fn test_builder_records_reads_once() {
    let mut b = BodyBuilder::new();
    let x = b.read(0);
    let y = b.read(1);
    let z = b.read_nonlocal(0);
    b.write(0, format!("{} + {} + {}", x, y, z));
    let body = b.finish();
    assert_eq!(body.reads(), &[ReadKind::Local, ReadKind::Nonlocal]);
    assert_eq!(x, "read(in0)");
    assert_eq!(z, "readNonlocal(in0)");
}

#[test]
fn test_nested_fragments() {
    let mut b = BodyBuilder::new();
    b.declare("float", "acc", "0.0f");
    b.for_loop("e", "0", "9", "1", |b| {
        let v = b.read_element(0, "e");
        b.assign("acc", format!("acc + {}", v));
    });
    b.if_then("_row < 4", |b| b.write(0, "acc"));
    let body = b.finish();
    assert_eq!(body.fragments().len(), 3);
    match &body.fragments()[1] {
        Fragment::Loop { var, body, .. } => {
            assert_eq!(var, "e");
            assert_eq!(body.len(), 1);
        }
        other => panic!("expected loop, got {:?}", other),
    }
    assert_eq!(body.writes(), vec![(WriteKind::Local, 0, 0)]);
}

#[test]
fn test_template_rebinding_replaces() {
    let mut t = Template::new();
    t.bind("HALO", 1);
    t.flag("CLAMP", true);
    t.bind("HALO", 2);
    assert_eq!(t.get("HALO"), Some("2"));
    assert_eq!(t.get("CLAMP"), Some("1"));
    assert_eq!(t.bindings().len(), 2);
}

#[test]
fn test_violations_whole_write_in_loop() {
    let mut b = BodyBuilder::new();
    b.for_loop("i", "0", "4", "1", |b| b.write(0, "i"));
    let body = b.finish();
    let problems = body.violations(AddressingMode::SmallTensor);
    assert_eq!(problems, vec!["write to out0 inside a loop".to_string()]);
}

#[test]
fn test_violations_double_write() {
    let mut b = BodyBuilder::new();
    b.write(0, "1.0f");
    b.if_then("_row > 2", |b| b.write(0, "2.0f"));
    let body = b.finish();
    let problems = body.violations(AddressingMode::ElementWise);
    assert!(
        problems.iter().any(|p| p.contains("more than once")),
        "got {:?}",
        problems
    );
}

#[test]
fn test_violations_illegal_primitives() {
    let mut b = BodyBuilder::new();
    let p = b.read_point(1);
    b.write_element(0, p, "_tensorElement");
    let body = b.finish();
    assert!(body.violations(AddressingMode::ElementWise)
        .iter()
        .any(|v| v.contains("readPoint")));
    assert!(body.violations(AddressingMode::SmallTensor)
        .iter()
        .any(|v| v.contains("writeElement")));
}

#[test]
fn test_big_tensor_loop_writes_are_legal() {
    let mut b = BodyBuilder::new();
    b.for_loop("m", "0", "4", "1", |b| {
        let v = b.read_element_nonlocal(0, "0");
        b.write_element_nonlocal(0, v, "0");
    });
    let body = b.finish();
    assert!(body.violations(AddressingMode::BigTensor).is_empty());
}

#[test]
fn test_float_literals() {
    assert_eq!(float_literal(2.0), "2.0f");
    assert_eq!(float_literal(-0.5), "-0.5f");
    assert_eq!(float_literal(f32::NAN), "NAN");
    assert_eq!(float_literal(f32::NEG_INFINITY), "(-INFINITY)");
}
