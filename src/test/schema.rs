#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::database::{
        ColumnDef, ColumnType, ForeignKey, IndexDef, TableDef, baseline_table, baseline_tables,
    };
    use crate::db::{Dialect, quote_ident};

    #[test]
    fn test_baseline_tables_reference_earlier_tables() {
        let mut created = HashSet::new();

        for table in baseline_tables() {
            for fk in &table.foreign_keys {
                assert!(
                    created.contains(&fk.references_table) || fk.references_table == table.name,
                    "{} references {} before it exists",
                    table.name,
                    fk.references_table
                );
                assert!(table.has_column(&fk.column), "{}.{} missing", table.name, fk.column);
            }
            assert!(created.insert(table.name.clone()), "duplicate table {}", table.name);
        }
    }

    #[test]
    fn test_every_baseline_table_renders_for_both_dialects() {
        for table in baseline_tables() {
            for dialect in [Dialect::MySql, Dialect::Sqlite] {
                let sql = table.render_create(dialect).unwrap();
                assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS"));
                for index in &table.indexes {
                    index.render_create(&table.name, dialect).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_table_rendering() {
        let table = TableDef::new("notes")
            .column(
                ColumnDef::new("title", ColumnType::Varchar(100))
                    .not_null()
                    .comment("Note's title"),
            )
            .column(ColumnDef::new("pinned", ColumnType::Bool).not_null().default("0"))
            .column(ColumnDef::new("owner_id", ColumnType::BigInt))
            .timestamps()
            .foreign_key(ForeignKey::new("owner_id", "users").cascade());

        let mysql = table.render_create(Dialect::MySql).unwrap();
        assert!(mysql.contains("`id` BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert!(mysql.contains("`title` VARCHAR(100) NOT NULL COMMENT 'Note''s title'"));
        assert!(mysql.contains("`pinned` TINYINT(1) NOT NULL DEFAULT 0"));
        assert!(mysql.contains("FOREIGN KEY (`owner_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"));
        assert!(mysql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));

        let sqlite = table.render_create(Dialect::Sqlite).unwrap();
        assert!(sqlite.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sqlite.contains("\"title\" TEXT NOT NULL"));
        assert!(!sqlite.contains("COMMENT"));
        assert!(sqlite.contains("\"created_at\" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_index_rendering() {
        let index = IndexDef::unique("uk_note_owner", &["owner_id", "title"]);

        assert_eq!(
            index.render_create("notes", Dialect::MySql).unwrap(),
            "CREATE UNIQUE INDEX `uk_note_owner` ON `notes` (`owner_id`, `title`)"
        );
        assert!(IndexDef::new("idx", &["bad column"])
            .render_create("notes", Dialect::Sqlite)
            .is_err());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident(Dialect::MySql, "students").unwrap(), "`students`");
        assert_eq!(quote_ident(Dialect::Sqlite, "_tmp1").unwrap(), "\"_tmp1\"");
        assert!(quote_ident(Dialect::MySql, "1abc").is_err());
        assert!(quote_ident(Dialect::MySql, "a`b").is_err());
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(Dialect::from_url("mysql://root@localhost/kg").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("postgres://localhost/kg").is_err());
    }

    #[test]
    fn test_baseline_lookup() {
        let students = baseline_table("students").unwrap();
        assert!(students.has_column("deleted_at"));
        assert!(baseline_table("no_such_table").is_none());
    }
}
