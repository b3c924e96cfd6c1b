use sqlnative_core::{ClauseSet, MethodSpec, ParameterBinding, QueryDescriptor, QueryKind, RepoError};

fn clauses(method: MethodSpec) -> ClauseSet {
    method.clauses
}

#[test]
fn select_with_where_renders_before_binding() {
    let set = clauses(
        MethodSpec::new("find")
            .select("name")
            .from("users")
            .where_clause("id = {id}"),
    );
    let kind = QueryKind::classify(&set).unwrap();
    kind.validate(&set).unwrap();
    assert_eq!(kind.render(&set), "SELECT name FROM users WHERE id = {id};");
}

#[test]
fn binding_substitutes_integer_values() {
    let binding: ParameterBinding = [("id", 42_i64)].into_iter().collect();
    assert_eq!(
        binding.apply("SELECT * FROM t WHERE id = {id};"),
        "SELECT * FROM t WHERE id = 42;"
    );
}

#[test]
fn insert_renders_target_and_values() {
    let set = clauses(MethodSpec::new("add").insert("t").values("(1,2)"));
    assert_eq!(QueryKind::classify(&set).unwrap(), QueryKind::Insert);
    assert_eq!(QueryKind::Insert.render(&set), "INSERT INTO t VALUES (1,2);");
}

#[test]
fn update_without_set_is_a_configuration_error() {
    let descriptor = QueryDescriptor::new(clauses(
        MethodSpec::new("touch").update("t").where_clause("id = 1"),
    ));
    match descriptor.prepare() {
        Err(RepoError::Configuration(message)) => {
            assert_eq!(message, "SET clause cannot be NULL/Empty in UPDATE query")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn native_keyword_overrides_structural_clauses() {
    for (native, expected) in [
        ("SELECT 1", QueryKind::Select),
        ("  Update t SET a = 1", QueryKind::Update),
        ("\tINSERT INTO t VALUES (1)", QueryKind::Insert),
        ("delete FROM t", QueryKind::Delete),
    ] {
        let set = clauses(
            MethodSpec::new("m")
                .native_query(native)
                .delete("t")
                .insert("t")
                .update("t")
                .select("*"),
        );
        assert_eq!(QueryKind::classify(&set).unwrap(), expected);
    }
}

#[test]
fn structural_priority_resolves_ambiguous_methods() {
    let cases = [
        (MethodSpec::new("m").select("*").delete("t").insert("t"), QueryKind::Delete),
        (MethodSpec::new("m").select("*").update("t").insert("t"), QueryKind::Insert),
        (MethodSpec::new("m").select("*").update("t"), QueryKind::Update),
        (MethodSpec::new("m").select("*"), QueryKind::Select),
    ];
    for (method, expected) in cases {
        assert_eq!(QueryKind::classify(&method.clauses).unwrap(), expected);
    }
}

#[test]
fn nothing_declared_is_unclassifiable() {
    let err = QueryKind::classify(&MethodSpec::new("m").from("t").clauses).unwrap_err();
    assert!(matches!(err, RepoError::Classification(_)));
}

#[test]
fn synthesis_is_repeatable() {
    let mut descriptor = QueryDescriptor::new(clauses(
        MethodSpec::new("page")
            .select("id")
            .from("t")
            .where_clause("owner = {owner}")
            .order_by("id DESC"),
    ));
    descriptor.binding.push("owner", 9_i64);

    let first = descriptor.prepare().unwrap();
    let second = descriptor.prepare().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.sql, "SELECT id FROM t WHERE owner = 9 ORDER BY id DESC;");
}
