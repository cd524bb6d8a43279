//! Built-in entity catalog for the admin console
//!
//! [`ENTITIES`] lists every relation the console needs, in creation order.
//! Join tables reference their parents by key but no constraint is emitted
//! while bootstrapping, so the order is not load-bearing.

pub mod seeds;

use crate::db::schema::{Column, ColumnDefault, ColumnType, EntityDescriptor, Index};

const ID: Column = Column::id();
const CREATED_AT: Column = Column::new("created_at", ColumnType::Timestamp)
    .default(ColumnDefault::CurrentTimestamp);
const UPDATED_AT: Column = Column::new("updated_at", ColumnType::Timestamp)
    .default(ColumnDefault::CurrentTimestamp);
/// Soft-delete marker
const DELETED_AT: Column = Column::new("deleted_at", ColumnType::Timestamp);

const fn varchar(name: &'static str) -> Column {
    Column::new(name, ColumnType::Varchar(191))
}

const fn bigint(name: &'static str) -> Column {
    Column::new(name, ColumnType::BigInt)
}

const fn flag(name: &'static str) -> Column {
    Column::new(name, ColumnType::Bool)
}

pub const USERS: EntityDescriptor = EntityDescriptor::new(
    "sys_users",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("uuid"),
        varchar("username"),
        varchar("password"),
        varchar("nick_name").default(ColumnDefault::Text("System User")),
        varchar("header_img")
            .default(ColumnDefault::Text("https://qmplusimg.henrongyi.top/head.png")),
        Column::new("authority_id", ColumnType::Varchar(90))
            .default(ColumnDefault::Text("888"))
            .references("sys_authorities", "authority_id"),
    ],
)
.indexes(&[
    Index::new("idx_sys_users_deleted_at", &["deleted_at"]),
    Index::new("idx_sys_users_uuid", &["uuid"]),
    Index::new("idx_sys_users_username", &["username"]),
]);

pub const AUTHORITIES: EntityDescriptor = EntityDescriptor::new(
    "sys_authorities",
    &[
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        Column::new("authority_id", ColumnType::Varchar(90)).not_null(),
        varchar("authority_name"),
        varchar("parent_id"),
        varchar("default_router").default(ColumnDefault::Text("dashboard")),
    ],
)
.primary_key(&["authority_id"]);

pub const APIS: EntityDescriptor = EntityDescriptor::new(
    "sys_apis",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("path"),
        varchar("description"),
        varchar("api_group"),
        varchar("method").default(ColumnDefault::Text("POST")),
    ],
)
.indexes(&[Index::new("idx_sys_apis_deleted_at", &["deleted_at"])]);

pub const BASE_MENUS: EntityDescriptor = EntityDescriptor::new(
    "sys_base_menus",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        Column::new("menu_level", ColumnType::Int).default(ColumnDefault::Int(0)),
        varchar("parent_id"),
        varchar("path"),
        varchar("name"),
        flag("hidden"),
        varchar("component"),
        Column::new("sort", ColumnType::Int),
        flag("keep_alive"),
        flag("default_menu"),
        varchar("title"),
        varchar("icon"),
        flag("close_tab"),
    ],
)
.indexes(&[Index::new("idx_sys_base_menus_deleted_at", &["deleted_at"])]);

pub const BASE_MENU_PARAMETERS: EntityDescriptor = EntityDescriptor::new(
    "sys_base_menu_parameters",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        bigint("sys_base_menu_id").references("sys_base_menus", "id"),
        varchar("type"),
        varchar("key"),
        varchar("value"),
    ],
)
.indexes(&[Index::new("idx_sys_base_menu_parameters_deleted_at", &["deleted_at"])]);

/// Authority to menu join table
pub const AUTHORITY_MENUS: EntityDescriptor = EntityDescriptor::new(
    "sys_authority_menus",
    &[
        Column::new("sys_authority_authority_id", ColumnType::Varchar(90))
            .not_null()
            .references("sys_authorities", "authority_id"),
        bigint("sys_base_menu_id")
            .not_null()
            .references("sys_base_menus", "id"),
    ],
)
.primary_key(&["sys_authority_authority_id", "sys_base_menu_id"]);

/// Which authorities' data an authority may see
pub const DATA_AUTHORITIES: EntityDescriptor = EntityDescriptor::new(
    "sys_data_authority_id",
    &[
        Column::new("sys_authority_authority_id", ColumnType::Varchar(90))
            .not_null()
            .references("sys_authorities", "authority_id"),
        Column::new("data_authority_id_authority_id", ColumnType::Varchar(90))
            .not_null()
            .references("sys_authorities", "authority_id"),
    ],
)
.primary_key(&["sys_authority_authority_id", "data_authority_id_authority_id"]);

pub const JWT_BLACKLISTS: EntityDescriptor = EntityDescriptor::new(
    "jwt_blacklists",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        Column::new("jwt", ColumnType::Text),
    ],
)
.indexes(&[Index::new("idx_jwt_blacklists_deleted_at", &["deleted_at"])]);

pub const DICTIONARIES: EntityDescriptor = EntityDescriptor::new(
    "sys_dictionaries",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("name"),
        varchar("type"),
        flag("status"),
        varchar("desc"),
    ],
)
.indexes(&[Index::new("idx_sys_dictionaries_deleted_at", &["deleted_at"])]);

pub const DICTIONARY_DETAILS: EntityDescriptor = EntityDescriptor::new(
    "sys_dictionary_details",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("label"),
        bigint("value"),
        flag("status"),
        bigint("sort"),
        bigint("sys_dictionary_id").references("sys_dictionaries", "id"),
    ],
)
.indexes(&[Index::new("idx_sys_dictionary_details_deleted_at", &["deleted_at"])]);

pub const FILE_UPLOADS: EntityDescriptor = EntityDescriptor::new(
    "exa_file_upload_and_downloads",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("name"),
        varchar("url"),
        varchar("tag"),
        varchar("key"),
    ],
)
.indexes(&[Index::new("idx_exa_file_upload_and_downloads_deleted_at", &["deleted_at"])]);

/// Breakpoint-resume upload, one row per file
pub const FILES: EntityDescriptor = EntityDescriptor::new(
    "exa_files",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("file_name"),
        varchar("file_md5"),
        varchar("file_path"),
        bigint("chunk_total"),
        flag("is_finish"),
    ],
)
.indexes(&[Index::new("idx_exa_files_deleted_at", &["deleted_at"])]);

pub const FILE_CHUNKS: EntityDescriptor = EntityDescriptor::new(
    "exa_file_chunks",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        bigint("exa_file_id").references("exa_files", "id"),
        bigint("file_chunk_number"),
        varchar("file_chunk_path"),
    ],
)
.indexes(&[Index::new("idx_exa_file_chunks_deleted_at", &["deleted_at"])]);

pub const SIMPLE_UPLOADERS: EntityDescriptor = EntityDescriptor::new(
    "exa_simple_uploaders",
    &[
        varchar("chunk_number"),
        varchar("current_chunk_size"),
        varchar("current_chunk_path"),
        varchar("total_size"),
        varchar("identifier"),
        varchar("filename"),
        varchar("total_chunks"),
        varchar("is_done"),
        varchar("file_path"),
    ],
);

pub const CUSTOMERS: EntityDescriptor = EntityDescriptor::new(
    "exa_customers",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("customer_name"),
        varchar("customer_phone_data"),
        bigint("sys_user_id").references("sys_users", "id"),
        varchar("sys_user_authority_id"),
    ],
)
.indexes(&[Index::new("idx_exa_customers_deleted_at", &["deleted_at"])]);

pub const OPERATION_RECORDS: EntityDescriptor = EntityDescriptor::new(
    "sys_operation_records",
    &[
        ID,
        CREATED_AT,
        UPDATED_AT,
        DELETED_AT,
        varchar("ip"),
        varchar("method"),
        varchar("path"),
        bigint("status"),
        bigint("latency"),
        varchar("agent"),
        varchar("error_message"),
        Column::new("body", ColumnType::Text),
        Column::new("resp", ColumnType::Text),
        bigint("user_id").references("sys_users", "id"),
    ],
)
.indexes(&[Index::new("idx_sys_operation_records_deleted_at", &["deleted_at"])]);

/// Access-control policy rules
pub const CASBIN_RULES: EntityDescriptor = EntityDescriptor::new(
    "casbin_rule",
    &[
        ID,
        Column::new("ptype", ColumnType::Varchar(100)),
        Column::new("v0", ColumnType::Varchar(100)),
        Column::new("v1", ColumnType::Varchar(100)),
        Column::new("v2", ColumnType::Varchar(100)),
        Column::new("v3", ColumnType::Varchar(100)),
        Column::new("v4", ColumnType::Varchar(100)),
        Column::new("v5", ColumnType::Varchar(100)),
    ],
)
.indexes(&[Index::unique(
    "idx_casbin_rule",
    &["ptype", "v0", "v1", "v2", "v3", "v4", "v5"],
)]);

/// Every entity of the console, in creation order
pub const ENTITIES: &[EntityDescriptor] = &[
    USERS,
    AUTHORITIES,
    APIS,
    BASE_MENUS,
    BASE_MENU_PARAMETERS,
    AUTHORITY_MENUS,
    DATA_AUTHORITIES,
    JWT_BLACKLISTS,
    DICTIONARIES,
    DICTIONARY_DETAILS,
    FILE_UPLOADS,
    FILES,
    FILE_CHUNKS,
    SIMPLE_UPLOADERS,
    CUSTOMERS,
    OPERATION_RECORDS,
    CASBIN_RULES,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::dialect::{MYSQL, POSTGRES};
    use crate::db::schema::create_table_sql;
    use std::collections::HashSet;

    #[test]
    fn test_table_and_index_names_are_unique() {
        let tables: HashSet<_> = ENTITIES.iter().map(|e| e.table).collect();
        assert_eq!(tables.len(), ENTITIES.len());

        let indexes: Vec<_> = ENTITIES
            .iter()
            .flat_map(|e| e.indexes.iter().map(|i| i.name))
            .collect();
        let unique: HashSet<_> = indexes.iter().collect();
        assert_eq!(unique.len(), indexes.len());
    }

    #[test]
    fn test_every_reference_points_at_a_catalog_column() {
        for entity in ENTITIES {
            for column in entity.columns {
                let Some((table, target)) = column.references else {
                    continue;
                };
                let parent = ENTITIES
                    .iter()
                    .find(|e| e.table == table)
                    .unwrap_or_else(|| panic!("{}.{} references unknown table {}", entity.table, column.name, table));
                assert!(
                    parent.columns.iter().any(|c| c.name == target),
                    "{}.{} references missing column {}.{}",
                    entity.table,
                    column.name,
                    table,
                    target
                );
            }
        }
    }

    #[test]
    fn test_key_columns_are_declared() {
        for entity in ENTITIES {
            entity
                .check_key_columns()
                .unwrap_or_else(|e| panic!("{}: {e}", entity.table));
        }
    }

    #[test]
    fn test_reserved_words_are_quoted() {
        let mysql = create_table_sql(&MYSQL, &DICTIONARIES, false);
        assert!(mysql.contains("`desc` VARCHAR(191)"));

        let pg = create_table_sql(&POSTGRES, &BASE_MENU_PARAMETERS, false);
        assert!(pg.contains("\"key\" VARCHAR(191)"));
        assert!(pg.contains("\"created_at\" TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP"));
    }
}
