use tempfile::tempdir;

use tinybase::executor::{ExecutionOutcome, Executor};
use tinybase::planner::parser::SqlParser;
use tinybase::types::value::Value;

fn run(executor: &mut Executor, parser: &SqlParser, sql: &str) -> ExecutionOutcome {
    let command = parser.parse(sql).unwrap_or_else(|err| panic!("{}: {}", sql, err));
    executor
        .execute(command)
        .unwrap_or_else(|err| panic!("{}: {}", sql, err))
}

fn run_err(executor: &mut Executor, parser: &SqlParser, sql: &str) -> String {
    let command = parser.parse(sql).unwrap_or_else(|err| panic!("{}: {}", sql, err));
    match executor.execute(command) {
        Ok(_) => panic!("expected an error from: {}", sql),
        Err(err) => err.to_string(),
    }
}

fn rows(outcome: ExecutionOutcome) -> Vec<Vec<Value>> {
    match outcome {
        ExecutionOutcome::Rows { rows, .. } => rows,
        _ => panic!("expected rows"),
    }
}

#[test]
fn test_create_insert_select() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );
    run(&mut executor, &parser, "INSERT INTO TABLE t VALUES (1, 'a')");
    run(&mut executor, &parser, "INSERT INTO TABLE t VALUES (3, 'c')");
    run(&mut executor, &parser, "INSERT INTO t VALUES (2, 'b')");

    let result = rows(run(&mut executor, &parser, "SELECT * FROM t"));
    assert_eq!(
        result,
        vec![
            vec![Value::Int(1), Value::Text("a".to_string())],
            vec![Value::Int(2), Value::Text("b".to_string())],
            vec![Value::Int(3), Value::Text("c".to_string())],
        ]
    );

    let result = rows(run(&mut executor, &parser, "SELECT n FROM t WHERE id = 2"));
    assert_eq!(result, vec![vec![Value::Text("b".to_string())]]);

    let result = rows(run(&mut executor, &parser, "SELECT id FROM t WHERE n <> 'a'"));
    assert_eq!(result, vec![vec![Value::Int(2)], vec![Value::Int(3)]]);
}

#[test]
fn test_semantic_errors_leave_state_unchanged() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );
    run(&mut executor, &parser, "INSERT INTO t VALUES (1, 'x')");

    // duplicate primary key
    let err = run_err(&mut executor, &parser, "INSERT INTO t VALUES (1, 'y')");
    assert!(err.contains("Duplicate primary key"));

    // NULL into NOT NULL
    let err = run_err(&mut executor, &parser, "INSERT INTO t VALUES (2, NULL)");
    assert!(err.contains("cannot be NULL"));

    // arity mismatch
    let err = run_err(&mut executor, &parser, "INSERT INTO t VALUES (2)");
    assert!(err.contains("expects 2 values"));

    // unknown table and column
    let err = run_err(&mut executor, &parser, "SELECT * FROM missing");
    assert!(err.contains("not found"));
    let err = run_err(&mut executor, &parser, "SELECT nope FROM t");
    assert!(err.contains("not found"));

    let result = rows(run(&mut executor, &parser, "SELECT * FROM t"));
    assert_eq!(result, vec![vec![Value::Int(1), Value::Text("x".to_string())]]);
}

#[test]
fn test_update_rules() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );
    run(&mut executor, &parser, "INSERT INTO t VALUES (1, 'a')");
    run(&mut executor, &parser, "INSERT INTO t VALUES (2, 'bb')");

    // wider replacement is rejected and the row stays put
    match run(
        &mut executor,
        &parser,
        "UPDATE t SET n = 'longer_string' WHERE id = 1",
    ) {
        ExecutionOutcome::Message(message) => assert!(message.starts_with("0 column")),
        _ => panic!("expected a message"),
    }
    let result = rows(run(&mut executor, &parser, "SELECT n FROM t WHERE id = 1"));
    assert_eq!(result, vec![vec![Value::Text("a".to_string())]]);

    // narrower replacement shrinks the stored value
    match run(&mut executor, &parser, "UPDATE t SET n = 'z' WHERE id = 2") {
        ExecutionOutcome::Message(message) => assert!(message.starts_with("1 column")),
        _ => panic!("expected a message"),
    }
    let result = rows(run(&mut executor, &parser, "SELECT n FROM t WHERE id = 2"));
    assert_eq!(result, vec![vec![Value::Text("z".to_string())]]);

    // UPDATE without a primary-key equality is a semantic error
    let err = run_err(&mut executor, &parser, "UPDATE t SET n = 'q' WHERE n = 'z'");
    assert!(err.contains("primary key"));
}

#[test]
fn test_delete_by_primary_key() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );
    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        run(
            &mut executor,
            &parser,
            &format!("INSERT INTO t VALUES ({}, '{}')", id, name),
        );
    }

    run(&mut executor, &parser, "DELETE FROM t WHERE id = 2");
    let result = rows(run(&mut executor, &parser, "SELECT * FROM t WHERE id = 2"));
    assert!(result.is_empty());
    let result = rows(run(&mut executor, &parser, "SELECT id FROM t"));
    assert_eq!(result, vec![vec![Value::Int(1)], vec![Value::Int(3)]]);
}

#[test]
fn test_null_semantics() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE notes (id INT PRIMARY KEY, note TEXT, score SMALLINT)",
    );
    run(
        &mut executor,
        &parser,
        "INSERT INTO notes VALUES (1, NULL, NULL)",
    );
    run(
        &mut executor,
        &parser,
        "INSERT INTO notes VALUES (2, 'kept', 10)",
    );

    let result = rows(run(&mut executor, &parser, "SELECT * FROM notes"));
    assert_eq!(result[0], vec![Value::Int(1), Value::Null, Value::Null]);
    assert_eq!(
        result[1],
        vec![Value::Int(2), Value::Text("kept".to_string()), Value::SmallInt(10)]
    );

    // NULL never satisfies a WHERE, not even against stored NULLs
    let result = rows(run(
        &mut executor,
        &parser,
        "SELECT * FROM notes WHERE note = NULL",
    ));
    assert!(result.is_empty());
    let result = rows(run(
        &mut executor,
        &parser,
        "SELECT id FROM notes WHERE score > 5",
    ));
    assert_eq!(result, vec![vec![Value::Int(2)]]);
}

#[test]
fn test_show_tables_and_catalog_rows() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );

    let names: Vec<Vec<Value>> = rows(run(&mut executor, &parser, "SHOW TABLES"));
    let names: Vec<String> = names
        .into_iter()
        .map(|row| row[0].to_string())
        .collect();
    assert_eq!(
        names,
        vec!["tinybase_tables", "tinybase_columns", "t"]
    );

    let result = rows(run(
        &mut executor,
        &parser,
        "SELECT column_name, is_nullable, column_key FROM tinybase_columns WHERE table_name = 't'",
    ));
    assert_eq!(
        result,
        vec![
            vec![
                Value::Text("id".to_string()),
                Value::Text("NO".to_string()),
                Value::Text("PRI".to_string()),
            ],
            vec![
                Value::Text("n".to_string()),
                Value::Text("NO".to_string()),
                Value::Text("".to_string()),
            ],
        ]
    );
}

#[test]
fn test_restart_round_trip() {
    let dir = tempdir().unwrap();
    let parser = SqlParser::new();

    {
        let mut executor = Executor::new(dir.path()).unwrap();
        run(
            &mut executor,
            &parser,
            "CREATE TABLE t (id INT PRIMARY KEY, n TEXT NOT NULL)",
        );
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            run(
                &mut executor,
                &parser,
                &format!("INSERT INTO t VALUES ({}, '{}')", id, name),
            );
        }
        match run(&mut executor, &parser, "EXIT") {
            ExecutionOutcome::Exit => {}
            _ => panic!("EXIT should end the session"),
        }
    }
    assert!(dir.path().join(".table_info").exists());

    let mut executor = Executor::new(dir.path()).unwrap();
    let result = rows(run(&mut executor, &parser, "SELECT * FROM t"));
    assert_eq!(
        result,
        vec![
            vec![Value::Int(1), Value::Text("a".to_string())],
            vec![Value::Int(2), Value::Text("b".to_string())],
            vec![Value::Int(3), Value::Text("c".to_string())],
        ]
    );

    // the reopened database accepts writes as before
    run(&mut executor, &parser, "INSERT INTO t VALUES (4, 'd')");
    let result = rows(run(&mut executor, &parser, "SELECT id FROM t WHERE id >= 3"));
    assert_eq!(result, vec![vec![Value::Int(3)], vec![Value::Int(4)]]);
}

#[test]
fn test_drop_table_cleans_catalog_and_file() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE a (id INT PRIMARY KEY, n TEXT NOT NULL)",
    );
    run(
        &mut executor,
        &parser,
        "CREATE TABLE b (id INT PRIMARY KEY, m TEXT NOT NULL)",
    );
    assert!(dir.path().join("a.tbl").exists());

    run(&mut executor, &parser, "DROP TABLE a");
    assert!(!dir.path().join("a.tbl").exists());
    assert!(dir.path().join("b.tbl").exists());

    let names: Vec<String> = rows(run(&mut executor, &parser, "SHOW TABLES"))
        .into_iter()
        .map(|row| row[0].to_string())
        .collect();
    assert!(!names.contains(&"a".to_string()));
    assert!(names.contains(&"b".to_string()));

    let result = rows(run(
        &mut executor,
        &parser,
        "SELECT * FROM tinybase_columns WHERE table_name = 'a'",
    ));
    assert!(result.is_empty());

    // row ids stay dense after the removal
    let ids: Vec<Vec<Value>> = rows(run(
        &mut executor,
        &parser,
        "SELECT row_id FROM tinybase_tables",
    ));
    let ids: Vec<i32> = ids
        .into_iter()
        .map(|row| match row[0] {
            Value::Int(id) => id,
            _ => panic!("non-integer row_id"),
        })
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let err = run_err(&mut executor, &parser, "DROP TABLE tinybase_tables");
    assert!(err.contains("catalog"));
    let err = run_err(&mut executor, &parser, "SELECT * FROM a");
    assert!(err.contains("not found"));
}

#[test]
fn test_date_and_numeric_types() {
    let dir = tempdir().unwrap();
    let mut executor = Executor::new(dir.path()).unwrap();
    let parser = SqlParser::new();

    run(
        &mut executor,
        &parser,
        "CREATE TABLE m (id INT PRIMARY KEY, flag TINYINT, big BIGINT, \
         ratio DOUBLE, created DATE, updated DATETIME)",
    );
    run(
        &mut executor,
        &parser,
        "INSERT INTO m VALUES (1, -3, 9876543210, 2.5, '2020-03-01', '2020-03-01_12:30:45')",
    );

    let result = rows(run(&mut executor, &parser, "SELECT * FROM m"));
    assert_eq!(result[0][1], Value::TinyInt(-3));
    assert_eq!(result[0][2], Value::BigInt(9_876_543_210));
    assert_eq!(result[0][3], Value::Double(2.5));
    assert_eq!(result[0][4].to_string(), "2020-03-01");
    assert_eq!(result[0][5].to_string(), "2020-03-01_12:30:45");

    let result = rows(run(
        &mut executor,
        &parser,
        "SELECT id FROM m WHERE created = '2020-03-01'",
    ));
    assert_eq!(result, vec![vec![Value::Int(1)]]);
}
