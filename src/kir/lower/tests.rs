use super::*;
use crate::kir::BodyBuilder;

fn opencl() -> Box<dyn KernelLowering> {
    create_kernel_lowering("opencl").unwrap()
}

#[test]
fn test_factory_targets() {
    assert_eq!(opencl().target_name(), "opencl");
    assert!(create_kernel_lowering("cl").is_some());
    assert!(create_kernel_lowering("cuda").is_none());
}

#[test]
fn test_defines_wrap_body() {
    let mut b = BodyBuilder::new();
    let size = b.define("FILTER_SIZE", 3);
    let flag = b.flag("FLIP", true);
    b.constant("int", "n", format!("{} * {}", size, flag));
    let src = opencl().lower(&b.finish());
    assert_eq!(
        src,
        "#define FILTER_SIZE 3\n#define FLIP 1\n\
         const int n = FILTER_SIZE * FLIP;\n\
         #undef FLIP\n#undef FILTER_SIZE\n"
    );
}

#[test]
fn test_control_flow_rendering() {
    let mut b = BodyBuilder::new();
    b.local_array("float", "tile", &["18".to_string(), "18".to_string()]);
    b.for_loop("tr", "get_local_id(1)", "18", "16", |b| {
        b.if_else(
            "row < 0",
            |b| b.assign("v", "0.0f"),
            |b| {
                let r = b.read_nonlocal(0);
                b.assign("v", r)
            },
        );
    });
    b.barrier();
    let src = opencl().lower(&b.finish());
    let expected = "\
__local float tile[18][18];
for (int tr = get_local_id(1); tr < 18; tr += 16) {
    if (row < 0) {
        v = 0.0f;
    } else {
        v = readNonlocal(in0);
    }
}
barrier(CLK_LOCAL_MEM_FENCE);
";
    assert_eq!(src, expected);
}

#[test]
fn test_writes_and_raw_text() {
    let mut b = BodyBuilder::new();
    b.private_array("float2", "v", "4");
    b.raw("v[0] = v[1];\n\nv[1] = v[2];");
    b.for_loop("m", "0", "4", "1", |b| {
        b.write_element_nonlocal(0, "v[m]", "plane")
    });
    let src = opencl().lower(&b.finish());
    assert!(src.contains("float2 v[4];"));
    assert!(src.contains("v[0] = v[1];\n\nv[1] = v[2];"));
    assert!(src.contains(concat!(
        "for (int m = 0; m < 4; m++) {\n",
        "    writeElementNonlocal(out0, v[m], plane);\n",
        "}",
    )));
}

#[test]
fn test_block_scopes_its_body() {
    let mut b = BodyBuilder::new();
    b.declare("float", "acc", "0.0f");
    b.block(|b| {
        b.declare("float", "acc", "1.0f");
        b.assign("x", "acc");
    });
    let body = b.finish();
    assert_eq!(body.fragments().len(), 2);
    assert_eq!(
        opencl().lower(&body),
        "float acc = 0.0f;\n{\n    float acc = 1.0f;\n    x = acc;\n}\n"
    );
}
