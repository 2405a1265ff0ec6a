use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

/// `AFTER UPDATE` trigger that gives a row a fresh version on every write.
///
/// SQLite does not fire triggers recursively by default, so the trigger's own
/// update does not retrigger it.
fn row_version_trigger(table: &str) -> String {
    format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS {table}_row_version
        AFTER UPDATE ON {table}
        FOR EACH ROW
        BEGIN
            UPDATE {table} SET row_version = randomblob(16) WHERE id = NEW.id;
        END
        "#
    )
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Products: versioned, audited, soft-deletable
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sku TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            price_cents INTEGER NOT NULL DEFAULT 0,
            row_version BLOB NOT NULL DEFAULT (randomblob(16)),
            created_at TEXT,
            created_by TEXT,
            modified_at TEXT,
            modified_by TEXT,
            is_deleted BOOLEAN NOT NULL DEFAULT 0,
            deleted_at TEXT,
            deleted_by TEXT
        )
        "#,
    )
    .await?;
    execute(db, &row_version_trigger("products")).await?;
    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_products_is_deleted ON products(is_deleted)",
    )
    .await?;

    // Roles: audited, soft-deletable, last writer wins
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            permissions TEXT NOT NULL DEFAULT '[]',
            created_at TEXT,
            created_by TEXT,
            modified_at TEXT,
            modified_by TEXT,
            is_deleted BOOLEAN NOT NULL DEFAULT 0,
            deleted_at TEXT,
            deleted_by TEXT
        )
        "#,
    )
    .await?;

    // Invoices: versioned, audited, physically deleted
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            number TEXT NOT NULL UNIQUE,
            customer TEXT NOT NULL,
            amount_cents INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'draft',
            row_version BLOB NOT NULL DEFAULT (randomblob(16)),
            created_at TEXT,
            created_by TEXT,
            modified_at TEXT,
            modified_by TEXT
        )
        "#,
    )
    .await?;
    execute(db, &row_version_trigger("invoices")).await?;

    tracing::info!("Database migrations applied");
    Ok(())
}
