use diyexpr::{
    compile, linearize, DataReference, DataType, Expression, Operator, ReferenceKind, Scalar,
    TableSchema, TableSource,
};

fn int_schema() -> TableSchema {
    TableSchema {
        left: vec![DataType::Int32, DataType::Int32, DataType::Int64, DataType::Float64],
        right: vec![DataType::Int32],
        output: vec![DataType::Int32],
    }
}

#[test]
fn test_compile_add_two_columns() -> anyhow::Result<()> {
    let program = compile("add(left[0], left[1])", &int_schema())?;
    assert_eq!(program.operators, vec![Operator::Add]);
    assert_eq!(program.operator_source_indices, vec![0, 1, 2]);
    assert_eq!(
        program.output_reference(),
        Some(&DataReference::output_column(DataType::Int32, 0))
    );
    assert_eq!(program.output_type, DataType::Int32);
    assert_eq!(program.intermediate_slot_count, 0);
    Ok(())
}

#[test]
fn test_call_and_infix_syntax_agree() -> anyhow::Result<()> {
    let cases = vec![
        ("add(add(left[0], left[1]), right[0])", "left[0] + left[1] + right[0]"),
        (
            "less(mul(left[3], 2.5:float64), sqrt(left[3]))",
            "left[3] * 2.5:float64 < sqrt(left[3])",
        ),
        (
            "logical_and(equal(left[0], 1:int32), not_equal(left[1], 2:int32))",
            "left[0] == 1:int32 && left[1] != 2:int32",
        ),
    ];
    for (call, infix) in cases {
        println!("Case: {}", infix);
        assert_eq!(compile(call, &int_schema())?, compile(infix, &int_schema())?);
    }
    Ok(())
}

#[test]
fn test_single_literal_program() -> anyhow::Result<()> {
    let program = compile("42:int16", &int_schema())?;
    assert_eq!(program.data_references.len(), 1);
    assert_eq!(program.data_references[0].kind, ReferenceKind::Literal);
    assert!(program.operators.is_empty());
    assert_eq!(program.literals, vec![Scalar::Int16(42)]);
    assert_eq!(program.output_type, DataType::Int16);
    Ok(())
}

#[test]
fn test_type_mismatch_is_reported() {
    let err = compile("left[0] + left[2]", &int_schema()).unwrap_err();
    match err.downcast_ref::<diyexpr::Error>() {
        Some(diyexpr::Error::OperandTypeMismatch { operator, types }) => {
            assert_eq!(*operator, Operator::Add);
            assert_eq!(types, &vec![DataType::Int32, DataType::Int64]);
        }
        other => panic!("expected an operand type mismatch, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Operator add was given operands of differing types: int32, int64."
    );
}

#[test]
fn test_parse_errors_are_reported() {
    let cases = vec!["add(left[0]", "frob(left[0])", "1:int99", "300:int8"];
    for case in cases {
        println!("Case: {}", case);
        let err = compile(case, &int_schema()).unwrap_err();
        assert!(err.downcast_ref::<diyexpr::pt_to_ast::Error>().is_some());
    }
}

#[test]
fn test_deep_left_chain_needs_one_slot() -> anyhow::Result<()> {
    // ((((l0 + l1) + l0) + l1) ... ) with 50 additions.
    let mut e = Expression::new();
    let a = e.column(TableSource::Left, 0);
    let b = e.column(TableSource::Left, 1);
    let mut acc = e.operation(Operator::Add, vec![a, b])?;
    for i in 0..49 {
        let next = if i % 2 == 0 { a } else { b };
        acc = e.operation(Operator::Add, vec![acc, next])?;
    }
    let program = linearize(&e, acc, &int_schema())?;
    assert_eq!(program.operators.len(), 50);
    assert_eq!(program.intermediate_slot_count, 1);
    // Both columns, one shared intermediate row, and the output.
    assert_eq!(program.data_references.len(), 4);
    Ok(())
}

#[test]
fn test_slot_width_follows_tree_shape() -> anyhow::Result<()> {
    // identity(1 + identity(1 + ... identity(1 + 1))): the literal operand holds no slot, so
    // only one partial result is ever live.
    let mut e = Expression::new();
    let leaves: Vec<_> = (0..11).map(|_| e.literal(Scalar::Int32(1))).collect();
    let mut acc = leaves[0];
    for leaf in &leaves[1..] {
        let sum = e.operation(Operator::Add, vec![*leaf, acc])?;
        acc = e.operation(Operator::Identity, vec![sum])?;
    }
    let program = linearize(&e, acc, &int_schema())?;
    assert_eq!(program.literals.len(), 11);
    assert_eq!(program.intermediate_slot_count, 1);

    // Each product on the left stays live while the nested sum on the right is computed.
    let program = compile(
        "left[0] * left[1] + (left[0] * left[1] + (left[0] * left[1] + left[0] * left[1]))",
        &int_schema(),
    )?;
    assert_eq!(program.intermediate_slot_count, 4);

    // A balanced tree of depth three holds at most three values at once.
    let program = compile(
        "((left[0] * left[1]) + (left[0] * left[1])) * ((left[0] * left[1]) + (left[0] * left[1]))",
        &int_schema(),
    )?;
    assert_eq!(program.intermediate_slot_count, 3);
    Ok(())
}

#[test]
fn test_operands_written_before_read() -> anyhow::Result<()> {
    let program = compile(
        "(left[0] + right[0]) * (left[1] - 3:int32) / abs(left[0] % 7:int32)",
        &int_schema(),
    )?;
    let mut written = vec![];
    for instruction in program.instructions() {
        for operand in instruction.operands {
            if program.data_references[*operand].kind == ReferenceKind::Intermediate {
                assert!(written.contains(operand));
            }
        }
        written.push(instruction.output);
    }
    assert_eq!(
        program.data_references[*written.last().unwrap()].kind,
        ReferenceKind::OutputColumn
    );
    Ok(())
}

#[test]
fn test_string_intermediate_rejected() {
    let schema = TableSchema::new(vec![DataType::String, DataType::String]);
    // Comparing strings at the root is fine.
    assert!(compile("left[0] < left[1]", &schema).is_ok());
    // Passing a string through an intermediate is not.
    let err = compile("identity(identity(left[0]))", &schema).unwrap_err();
    assert_eq!(
        err.downcast_ref::<diyexpr::Error>(),
        Some(&diyexpr::Error::NotFixedWidth(DataType::String))
    );
}
