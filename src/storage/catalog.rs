use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::schema::{ColumnAttribute, ColumnSchema, TableSchema};
use crate::storage::table::{Filter, TableEngine, FANOUT_UNSET};
use crate::types::error::{DatabaseError, Result};
use crate::types::row::Row;
use crate::types::value::{type_code_for, OperatorType, SchemaDataType, Value, INT};
use crate::types::TypeCode;

pub const TABLES_META: &str = "tinybase_tables";
pub const COLUMNS_META: &str = "tinybase_columns";

// Side file holding `root_page fanout` for the two catalog tables, so they
// can be opened before their own rows are readable.
const TABLE_INFO_FILE: &str = ".table_info";

fn tables_meta_schema() -> TableSchema {
    TableSchema::new(
        TABLES_META,
        vec![
            ColumnSchema::new("row_id", SchemaDataType::Int, ColumnAttribute::PrimaryKey),
            ColumnSchema::new("table_name", SchemaDataType::Text, ColumnAttribute::NotNull),
            ColumnSchema::new("root_page", SchemaDataType::Int, ColumnAttribute::NotNull),
            ColumnSchema::new("fanout", SchemaDataType::Int, ColumnAttribute::NotNull),
        ],
    )
}

fn columns_meta_schema() -> TableSchema {
    TableSchema::new(
        COLUMNS_META,
        vec![
            ColumnSchema::new("row_id", SchemaDataType::Int, ColumnAttribute::PrimaryKey),
            ColumnSchema::new("table_name", SchemaDataType::Text, ColumnAttribute::NotNull),
            ColumnSchema::new("column_name", SchemaDataType::Text, ColumnAttribute::NotNull),
            ColumnSchema::new("data_type", SchemaDataType::Text, ColumnAttribute::NotNull),
            ColumnSchema::new(
                "ordinal_position",
                SchemaDataType::TinyInt,
                ColumnAttribute::NotNull,
            ),
            ColumnSchema::new("is_nullable", SchemaDataType::Text, ColumnAttribute::NotNull),
            ColumnSchema::new("column_key", SchemaDataType::Text, ColumnAttribute::CouldNull),
        ],
    )
}

/// Registry of open table engines plus the two self-describing meta-tables.
pub struct Catalog {
    data_dir: PathBuf,
    tables: HashMap<String, TableEngine>,
}

impl Catalog {
    /// Open the catalog under `data_dir`. A fresh directory bootstraps both
    /// meta-tables and registers them in themselves; otherwise their root
    /// page and fanout come from the `.table_info` side file.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let mut catalog = Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            tables: HashMap::new(),
        };

        let tables_path = catalog.table_path(TABLES_META);
        let columns_path = catalog.table_path(COLUMNS_META);

        if tables_path.exists() || columns_path.exists() {
            let ((tables_root, tables_fanout), (columns_root, columns_fanout)) =
                catalog.load_root_table_info();
            let tables_engine =
                TableEngine::load(&tables_path, tables_meta_schema(), tables_root, tables_fanout)?;
            let columns_engine = TableEngine::load(
                &columns_path,
                columns_meta_schema(),
                columns_root,
                columns_fanout,
            )?;
            catalog.tables.insert(TABLES_META.to_string(), tables_engine);
            catalog.tables.insert(COLUMNS_META.to_string(), columns_engine);
            debug!(dir = %catalog.data_dir.display(), "catalog loaded");
        } else {
            let tables_engine = TableEngine::create(&tables_path, tables_meta_schema())?;
            let columns_engine = TableEngine::create(&columns_path, columns_meta_schema())?;
            catalog.tables.insert(TABLES_META.to_string(), tables_engine);
            catalog.tables.insert(COLUMNS_META.to_string(), columns_engine);
            catalog.register_table(&tables_meta_schema())?;
            catalog.register_table(&columns_meta_schema())?;
            debug!(dir = %catalog.data_dir.display(), "catalog bootstrapped");
        }

        Ok(catalog)
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.tbl", name))
    }

    fn table_info_path(&self) -> PathBuf {
        self.data_dir.join(TABLE_INFO_FILE)
    }

    /// `(root_page, fanout)` per catalog table, one line each; a missing or
    /// short side file falls back to a fresh-looking `(0, unset)`.
    fn load_root_table_info(&self) -> ((i32, i32), (i32, i32)) {
        let content = fs::read_to_string(self.table_info_path()).unwrap_or_default();
        let mut lines = content.lines();
        let mut parse_line = || -> (i32, i32) {
            match lines.next() {
                Some(line) => {
                    let mut fields = line.split_whitespace();
                    let root = fields.next().and_then(|f| f.parse().ok()).unwrap_or(0);
                    let fanout = fields
                        .next()
                        .and_then(|f| f.parse().ok())
                        .unwrap_or(FANOUT_UNSET);
                    (root, fanout)
                }
                None => (0, FANOUT_UNSET),
            }
        };
        let tables_info = parse_line();
        let columns_info = parse_line();
        (tables_info, columns_info)
    }

    /// Persist the catalog tables' own root/fanout; called on clean shutdown.
    pub fn save_table_info(&self) -> Result<()> {
        let mut content = String::new();
        for name in [TABLES_META, COLUMNS_META] {
            let engine = self.open_table(name)?;
            content.push_str(&format!("{} {}\n", engine.root_page(), engine.fanout()));
        }
        fs::write(self.table_info_path(), content)?;
        Ok(())
    }

    fn open_table(&self, name: &str) -> Result<&TableEngine> {
        self.tables
            .get(name)
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    fn open_table_mut(&mut self, name: &str) -> Result<&mut TableEngine> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    /// Create the table file and describe it in the meta-tables.
    pub fn create_table(&mut self, schema: TableSchema) -> Result<()> {
        let name = schema.table_name.clone();
        if self.tables.contains_key(&name) || self.table_path(&name).exists() {
            return Err(DatabaseError::TableAlreadyExists { name });
        }
        let engine = TableEngine::create(self.table_path(&name), schema.clone())?;
        self.tables.insert(name, engine);
        self.register_table(&schema)?;
        Ok(())
    }

    /// Insert one `tinybase_tables` row (root/fanout are placeholders until
    /// `update_table_info` runs) and one `tinybase_columns` row per column.
    fn register_table(&mut self, schema: &TableSchema) -> Result<()> {
        let tables_row_id = self.open_table_mut(TABLES_META)?.select(None)?.len() as i32 + 1;
        self.insert_into_meta(
            TABLES_META,
            vec![
                Value::Int(tables_row_id),
                Value::Text(schema.table_name.clone()),
                Value::Int(0),
                Value::Int(FANOUT_UNSET),
            ],
        )?;

        let columns_row_id = self.open_table_mut(COLUMNS_META)?.select(None)?.len() as i32;
        for (position, column) in schema.columns.iter().enumerate() {
            self.insert_into_meta(
                COLUMNS_META,
                vec![
                    Value::Int(columns_row_id + position as i32 + 1),
                    Value::Text(schema.table_name.clone()),
                    Value::Text(column.name.clone()),
                    Value::Text(column.data_type.as_sql_name().to_string()),
                    Value::TinyInt(position as i8 + 1),
                    Value::Text(column.attribute.nullable_str().to_string()),
                    Value::Text(column.attribute.key_str().to_string()),
                ],
            )?;
        }
        Ok(())
    }

    fn insert_into_meta(&mut self, table: &str, values: Vec<Value>) -> Result<()> {
        let engine = self.open_table_mut(table)?;
        let type_codes: Vec<TypeCode> = engine
            .schema()
            .columns
            .iter()
            .zip(&values)
            .map(|(column, value)| type_code_for(column.data_type, value))
            .collect::<Result<_>>()?;
        engine.insert(&type_codes, &values)
    }

    /// Copy a table's in-memory root page and fanout into its
    /// `tinybase_tables` row after a structural mutation.
    pub fn update_table_info(&mut self, table_name: &str) -> Result<()> {
        if !self.tables.contains_key(table_name) {
            return Ok(());
        }
        let (root_page, fanout) = {
            let engine = self.open_table(table_name)?;
            (engine.root_page(), engine.fanout())
        };

        let rows = self.select_meta_by_table_name(TABLES_META, table_name)?;
        let row_id = match rows.first().map(|row| &row.values[0]) {
            Some(Value::Int(row_id)) => *row_id,
            _ => return Ok(()),
        };

        self.open_table_mut(TABLES_META)?.update(
            row_id,
            &[
                (2, INT, Value::Int(root_page)),
                (3, INT, Value::Int(fanout)),
            ],
        )?;
        Ok(())
    }

    fn select_meta_by_table_name(&mut self, meta: &str, table_name: &str) -> Result<Vec<Row>> {
        let value = Value::Text(table_name.to_string());
        let type_code = type_code_for(SchemaDataType::Text, &value)?;
        let filter = Filter {
            column_index: 1,
            op: OperatorType::Equal,
            type_code,
            value,
        };
        self.open_table_mut(meta)?.select(Some(&filter))
    }

    /// Handle for a table, loading it from the catalog on first use.
    pub fn table(&mut self, name: &str) -> Result<&mut TableEngine> {
        if !self.tables.contains_key(name) {
            if !self.table_path(name).exists() {
                return Err(DatabaseError::TableNotFound {
                    name: name.to_string(),
                });
            }
            self.load_table(name)?;
        }
        self.open_table_mut(name)
    }

    /// Reconstruct the schema from the catalog rows and open the table file.
    fn load_table(&mut self, name: &str) -> Result<()> {
        let info_rows = self.select_meta_by_table_name(TABLES_META, name)?;
        let info = info_rows
            .first()
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })?;
        let root_page = match &info.values[2] {
            Value::Int(root_page) => *root_page,
            _ => 0,
        };
        let fanout = match &info.values[3] {
            Value::Int(fanout) => *fanout,
            _ => FANOUT_UNSET,
        };

        let mut column_rows = self.select_meta_by_table_name(COLUMNS_META, name)?;
        // ordinal_position is authoritative for column order
        column_rows.sort_by_key(|row| match row.values[4] {
            Value::TinyInt(position) => position,
            _ => i8::MAX,
        });

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let column_name = match &row.values[2] {
                Value::Text(column_name) => column_name.clone(),
                other => {
                    return Err(DatabaseError::CorruptedTable {
                        reason: format!("bad column name {:?} in catalog", other),
                    })
                }
            };
            let data_type = match &row.values[3] {
                Value::Text(type_name) => SchemaDataType::from_sql_name(type_name).ok_or_else(
                    || DatabaseError::CorruptedTable {
                        reason: format!("unknown data type '{}' in catalog", type_name),
                    },
                )?,
                other => {
                    return Err(DatabaseError::CorruptedTable {
                        reason: format!("bad data type {:?} in catalog", other),
                    })
                }
            };
            let attribute = if matches!(&row.values[6], Value::Text(key) if key == "PRI") {
                ColumnAttribute::PrimaryKey
            } else if matches!(&row.values[5], Value::Text(nullable) if nullable == "YES") {
                ColumnAttribute::CouldNull
            } else {
                ColumnAttribute::NotNull
            };
            columns.push(ColumnSchema::new(&column_name, data_type, attribute));
        }

        let schema = TableSchema::new(name, columns);
        let engine = TableEngine::load(self.table_path(name), schema, root_page, fanout)?;
        self.tables.insert(name.to_string(), engine);
        debug!(table = name, root_page, fanout, "table loaded");
        Ok(())
    }

    /// Forget the table in both meta-tables, keep surviving row ids dense,
    /// and remove the file.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if name == TABLES_META || name == COLUMNS_META {
            return Err(DatabaseError::CatalogTableProtected {
                name: name.to_string(),
            });
        }
        if !self.tables.contains_key(name) && !self.table_path(name).exists() {
            return Err(DatabaseError::TableNotFound {
                name: name.to_string(),
            });
        }

        self.clear_table_info(COLUMNS_META, name)?;
        self.clear_table_info(TABLES_META, name)?;
        self.tables.remove(name);
        fs::remove_file(self.table_path(name))?;
        Ok(())
    }

    fn clear_table_info(&mut self, meta: &str, table_name: &str) -> Result<()> {
        let rows = self.select_meta_by_table_name(meta, table_name)?;
        for row in &rows {
            if let Value::Int(row_id) = row.values[0] {
                self.open_table_mut(meta)?.delete(row_id)?;
            }
        }
        self.compact_row_ids(meta)
    }

    /// Re-key rows so row ids stay dense after deletions. Rows are re-keyed
    /// downwards, so each target id is already free by the time it is reused.
    fn compact_row_ids(&mut self, meta: &str) -> Result<()> {
        let rows = self.open_table_mut(meta)?.select(None)?;
        for (position, row) in rows.iter().enumerate() {
            let expected = position as i32 + 1;
            let actual = match row.values[0] {
                Value::Int(actual) => actual,
                _ => continue,
            };
            if actual == expected {
                continue;
            }
            let engine = self.open_table_mut(meta)?;
            engine.delete(actual)?;
            let mut values = row.values.clone();
            values[0] = Value::Int(expected);
            engine.insert(&row.type_codes, &values)?;
        }
        Ok(())
    }
}
