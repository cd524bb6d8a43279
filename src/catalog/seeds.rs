//! Baseline data for the admin console
//!
//! [`default_steps`] returns the seed sequence in the order it must run.
//! Every row is keyed, so running the sequence again only fills gaps.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use async_trait::async_trait;

use crate::db::seed::{insert_missing, SeedRow, SeedStep};
use crate::db::DynDatabasePool;

/// Initial password of the seeded accounts
pub const DEFAULT_PASSWORD: &str = "123456";

/// Role granted every API and menu
pub const SUPER_AUTHORITY: &str = "888";

const AUTHORITY_MENU_VIEW: &str = "authority_menu";

/// Seed step that inserts missing keyed rows into one table
pub struct TableSeed {
    name: &'static str,
    table: &'static str,
    rows: fn() -> Result<Vec<SeedRow>>,
}

impl TableSeed {
    pub const fn new(
        name: &'static str,
        table: &'static str,
        rows: fn() -> Result<Vec<SeedRow>>,
    ) -> Self {
        Self { name, table, rows }
    }
}

#[async_trait]
impl SeedStep for TableSeed {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, pool: &DynDatabasePool) -> Result<u64> {
        let rows = (self.rows)()?;
        insert_missing(pool, self.table, &rows).await
    }
}

/// Joins authorities to the menus they may open
pub struct AuthorityMenuView;

#[async_trait]
impl SeedStep for AuthorityMenuView {
    fn name(&self) -> &'static str {
        "authority_menu_view"
    }

    async fn run(&self, pool: &DynDatabasePool) -> Result<u64> {
        let select = "SELECT sys_base_menus.*, \
             sys_authority_menus.sys_base_menu_id AS menu_id, \
             sys_authority_menus.sys_authority_authority_id AS authority_id \
             FROM sys_authority_menus \
             INNER JOIN sys_base_menus ON sys_authority_menus.sys_base_menu_id = sys_base_menus.id";

        pool.execute(&pool.dialect().create_view(AUTHORITY_MENU_VIEW, select))
            .await
            .with_context(|| format!("Failed to create view {}", AUTHORITY_MENU_VIEW))?;
        Ok(0)
    }
}

/// The seed sequence, in execution order
pub fn default_steps() -> Vec<Box<dyn SeedStep>> {
    vec![
        Box::new(TableSeed::new("admin_users", "sys_users", admin_users)),
        Box::new(TableSeed::new("apis", "sys_apis", apis)),
        Box::new(AuthorityMenuView),
        Box::new(TableSeed::new("authorities", "sys_authorities", authorities)),
        Box::new(TableSeed::new(
            "authority_menus",
            "sys_authority_menus",
            authority_menus,
        )),
        Box::new(TableSeed::new("casbin_rules", "casbin_rule", casbin_rules)),
        Box::new(TableSeed::new(
            "data_authorities",
            "sys_data_authority_id",
            data_authorities,
        )),
        Box::new(TableSeed::new("dictionaries", "sys_dictionaries", dictionaries)),
        Box::new(TableSeed::new(
            "dictionary_details",
            "sys_dictionary_details",
            dictionary_details,
        )),
        Box::new(TableSeed::new(
            "files",
            "exa_file_upload_and_downloads",
            files,
        )),
        Box::new(TableSeed::new("base_menus", "sys_base_menus", base_menus)),
    ]
}

/// Hash a password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

fn admin_users() -> Result<Vec<SeedRow>> {
    let accounts = [
        ("admin", "Super Admin", "http://qmplusimg.henrongyi.top/gva_header.jpg", SUPER_AUTHORITY),
        ("a303176530", "QMPlusUser", "http://qmplusimg.henrongyi.top/1572075907logo.png", "9528"),
    ];

    accounts
        .into_iter()
        .map(|(username, nick_name, header_img, authority_id)| -> Result<SeedRow> {
            Ok(SeedRow::new()
                .key("username", username)
                .value("uuid", uuid::Uuid::new_v4().to_string())
                .value("password", hash_password(DEFAULT_PASSWORD)?)
                .value("nick_name", nick_name)
                .value("header_img", header_img)
                .value("authority_id", authority_id))
        })
        .collect()
}

/// `(path, description, group, method)`
const API_CATALOG: &[(&str, &str, &str, &str)] = &[
    ("/base/login", "User login", "base", "POST"),
    ("/user/register", "User register", "user", "POST"),
    ("/user/getUserList", "List users", "user", "POST"),
    ("/user/setUserInfo", "Update user info", "user", "PUT"),
    ("/user/deleteUser", "Delete user", "user", "DELETE"),
    ("/user/changePassword", "Change password", "user", "POST"),
    ("/user/setUserAuthority", "Change user authority", "user", "POST"),
    ("/api/createApi", "Create api", "api", "POST"),
    ("/api/deleteApi", "Delete api", "api", "POST"),
    ("/api/updateApi", "Update api", "api", "POST"),
    ("/api/getApiList", "List apis", "api", "POST"),
    ("/api/getAllApis", "All apis", "api", "POST"),
    ("/api/getApiById", "Get api", "api", "POST"),
    ("/authority/createAuthority", "Create authority", "authority", "POST"),
    ("/authority/deleteAuthority", "Delete authority", "authority", "POST"),
    ("/authority/getAuthorityList", "List authorities", "authority", "POST"),
    ("/authority/setDataAuthority", "Set data authority", "authority", "POST"),
    ("/authority/updateAuthority", "Update authority", "authority", "PUT"),
    ("/authority/copyAuthority", "Copy authority", "authority", "POST"),
    ("/menu/getMenu", "Menu tree for current user", "menu", "POST"),
    ("/menu/getMenuList", "List menus", "menu", "POST"),
    ("/menu/addBaseMenu", "Create menu", "menu", "POST"),
    ("/menu/getBaseMenuTree", "Menu tree", "menu", "POST"),
    ("/menu/addMenuAuthority", "Grant menus to authority", "menu", "POST"),
    ("/menu/getMenuAuthority", "Menus of authority", "menu", "POST"),
    ("/menu/deleteBaseMenu", "Delete menu", "menu", "POST"),
    ("/menu/updateBaseMenu", "Update menu", "menu", "POST"),
    ("/menu/getBaseMenuById", "Get menu", "menu", "POST"),
    ("/casbin/updateCasbin", "Update role api permissions", "casbin", "POST"),
    ("/casbin/getPolicyPathByAuthorityId", "Api permissions of role", "casbin", "POST"),
    ("/jwt/jsonInBlacklist", "Blacklist token", "jwt", "POST"),
    ("/fileUploadAndDownload/upload", "Upload file", "fileUploadAndDownload", "POST"),
    ("/fileUploadAndDownload/getFileList", "List files", "fileUploadAndDownload", "POST"),
    ("/fileUploadAndDownload/deleteFile", "Delete file", "fileUploadAndDownload", "POST"),
    ("/sysDictionary/createSysDictionary", "Create dictionary", "sysDictionary", "POST"),
    ("/sysDictionary/deleteSysDictionary", "Delete dictionary", "sysDictionary", "DELETE"),
    ("/sysDictionary/updateSysDictionary", "Update dictionary", "sysDictionary", "PUT"),
    ("/sysDictionary/findSysDictionary", "Get dictionary", "sysDictionary", "GET"),
    ("/sysDictionary/getSysDictionaryList", "List dictionaries", "sysDictionary", "GET"),
    ("/sysDictionaryDetail/createSysDictionaryDetail", "Create dictionary detail", "sysDictionaryDetail", "POST"),
    ("/sysDictionaryDetail/deleteSysDictionaryDetail", "Delete dictionary detail", "sysDictionaryDetail", "DELETE"),
    ("/sysDictionaryDetail/updateSysDictionaryDetail", "Update dictionary detail", "sysDictionaryDetail", "PUT"),
    ("/sysDictionaryDetail/findSysDictionaryDetail", "Get dictionary detail", "sysDictionaryDetail", "GET"),
    ("/sysDictionaryDetail/getSysDictionaryDetailList", "List dictionary details", "sysDictionaryDetail", "GET"),
    ("/sysOperationRecord/getSysOperationRecordList", "List operation records", "sysOperationRecord", "GET"),
    ("/sysOperationRecord/deleteSysOperationRecord", "Delete operation record", "sysOperationRecord", "DELETE"),
    ("/system/getServerInfo", "Server status", "system", "POST"),
    ("/customer/customer", "Create customer", "customer", "POST"),
    ("/customer/customerList", "List customers", "customer", "GET"),
];

/// API groups open to the non-super authorities
const RESTRICTED_GROUPS: &[&str] = &["base", "user", "menu", "jwt", "customer"];

fn apis() -> Result<Vec<SeedRow>> {
    Ok(API_CATALOG
        .iter()
        .map(|(path, description, group, method)| {
            SeedRow::new()
                .key("path", *path)
                .key("method", *method)
                .value("description", *description)
                .value("api_group", *group)
        })
        .collect())
}

/// `(authority_id, name, parent_id)`
const AUTHORITIES: &[(&str, &str, &str)] = &[
    (SUPER_AUTHORITY, "Regular User", "0"),
    ("8881", "Regular User Child", SUPER_AUTHORITY),
    ("9528", "Test Role", "0"),
];

fn authorities() -> Result<Vec<SeedRow>> {
    Ok(AUTHORITIES
        .iter()
        .map(|(authority_id, name, parent_id)| {
            SeedRow::new()
                .key("authority_id", *authority_id)
                .value("authority_name", *name)
                .value("parent_id", *parent_id)
                .value("default_router", "dashboard")
        })
        .collect())
}

/// `(id, menu_level, parent_id, path, name, hidden, component, sort, keep_alive, title, icon)`
type MenuDef = (
    i64,
    i64,
    &'static str,
    &'static str,
    &'static str,
    bool,
    &'static str,
    i64,
    bool,
    &'static str,
    &'static str,
);

const MENUS: &[MenuDef] = &[
    (1, 0, "0", "dashboard", "dashboard", false, "view/dashboard/index.vue", 1, false, "Dashboard", "setting"),
    (2, 0, "0", "about", "about", false, "view/about/index.vue", 7, false, "About", "info"),
    (3, 0, "0", "admin", "superAdmin", false, "view/superAdmin/index.vue", 3, false, "Super Admin", "user-solid"),
    (4, 0, "3", "authority", "authority", false, "view/superAdmin/authority/authority.vue", 1, false, "Roles", "s-custom"),
    (5, 0, "3", "menu", "menu", false, "view/superAdmin/menu/menu.vue", 2, true, "Menus", "s-order"),
    (6, 0, "3", "api", "api", false, "view/superAdmin/api/api.vue", 3, true, "Apis", "s-platform"),
    (7, 0, "3", "user", "user", false, "view/superAdmin/user/user.vue", 4, false, "Users", "coordinate"),
    (8, 0, "0", "person", "person", true, "view/person/person.vue", 4, false, "Profile", "message-solid"),
    (9, 0, "0", "example", "example", false, "view/example/index.vue", 6, false, "Examples", "s-management"),
    (10, 0, "9", "excel", "excel", false, "view/example/excel/excel.vue", 4, false, "Excel import/export", "s-marketing"),
    (11, 0, "9", "upload", "upload", false, "view/example/upload/upload.vue", 5, false, "Media library", "upload"),
    (12, 0, "9", "breakpoint", "breakpoint", false, "view/example/breakpoint/breakpoint.vue", 6, false, "Resumable upload", "upload"),
    (13, 0, "9", "customer", "customer", false, "view/example/customer/customer.vue", 7, false, "Customers", "s-custom"),
    (14, 0, "0", "systemTools", "systemTools", false, "view/systemTools/index.vue", 5, false, "System tools", "s-cooperation"),
    (15, 0, "14", "autoCode", "autoCode", false, "view/systemTools/autoCode/index.vue", 1, true, "Code generator", "cpu"),
    (16, 0, "14", "formCreate", "formCreate", false, "view/systemTools/formCreate/index.vue", 2, true, "Form builder", "magic-stick"),
    (17, 0, "14", "system", "system", false, "view/systemTools/system/system.vue", 3, false, "System config", "s-operation"),
    (18, 0, "3", "dictionary", "dictionary", false, "view/superAdmin/dictionary/sysDictionary.vue", 5, false, "Dictionaries", "notebook-2"),
    (19, 0, "3", "dictionaryDetail/:id", "dictionaryDetail", true, "view/superAdmin/dictionary/sysDictionaryDetail.vue", 1, false, "Dictionary details", "s-order"),
    (20, 0, "3", "operation", "operation", false, "view/superAdmin/operation/sysOperationRecord.vue", 6, false, "Operation history", "time"),
    (21, 0, "9", "simpleUploader", "simpleUploader", false, "view/example/simpleUploader/simpleUploader", 6, false, "Resumable upload (plugin)", "upload"),
    (22, 0, "0", "https://www.gin-vue-admin.com", "https://www.gin-vue-admin.com", false, "/", 0, false, "Website", "s-home"),
    (23, 0, "0", "state", "state", false, "view/system/state.vue", 6, false, "Server status", "cloudy"),
];

fn base_menus() -> Result<Vec<SeedRow>> {
    Ok(MENUS
        .iter()
        .map(
            |&(id, level, parent_id, path, name, hidden, component, sort, keep_alive, title, icon)| {
                SeedRow::new()
                    .key("id", id)
                    .value("menu_level", level)
                    .value("parent_id", parent_id)
                    .value("path", path)
                    .value("name", name)
                    .value("hidden", hidden)
                    .value("component", component)
                    .value("sort", sort)
                    .value("keep_alive", keep_alive)
                    .value("default_menu", false)
                    .value("title", title)
                    .value("icon", icon)
                    .value("close_tab", false)
            },
        )
        .collect())
}

/// Menus visible to the restricted authorities
const RESTRICTED_MENUS: &[i64] = &[1, 2, 8, 9, 13, 22];

fn authority_menus() -> Result<Vec<SeedRow>> {
    let grant = |authority_id: &'static str, menu_id: i64| {
        SeedRow::new()
            .key("sys_authority_authority_id", authority_id)
            .key("sys_base_menu_id", menu_id)
    };

    let mut rows: Vec<SeedRow> = MENUS
        .iter()
        .map(|menu| grant(SUPER_AUTHORITY, menu.0))
        .collect();
    for authority_id in ["8881", "9528"] {
        rows.extend(RESTRICTED_MENUS.iter().map(|&id| grant(authority_id, id)));
    }
    Ok(rows)
}

fn casbin_rules() -> Result<Vec<SeedRow>> {
    let rule = |authority_id: &'static str, path: &'static str, method: &'static str| {
        SeedRow::new()
            .key("ptype", "p")
            .key("v0", authority_id)
            .key("v1", path)
            .key("v2", method)
    };

    let mut rows: Vec<SeedRow> = API_CATALOG
        .iter()
        .map(|&(path, _, _, method)| rule(SUPER_AUTHORITY, path, method))
        .collect();
    for authority_id in ["8881", "9528"] {
        rows.extend(
            API_CATALOG
                .iter()
                .filter(|(_, _, group, _)| RESTRICTED_GROUPS.contains(group))
                .map(|&(path, _, _, method)| rule(authority_id, path, method)),
        );
    }
    Ok(rows)
}

fn data_authorities() -> Result<Vec<SeedRow>> {
    let pairs = [
        (SUPER_AUTHORITY, SUPER_AUTHORITY),
        (SUPER_AUTHORITY, "8881"),
        (SUPER_AUTHORITY, "9528"),
        ("9528", "8881"),
        ("9528", "9528"),
    ];

    Ok(pairs
        .into_iter()
        .map(|(authority_id, visible)| {
            SeedRow::new()
                .key("sys_authority_authority_id", authority_id)
                .key("data_authority_id_authority_id", visible)
        })
        .collect())
}

/// `(id, name, type, description)`
const DICTIONARIES: &[(i64, &str, &str, &str)] = &[
    (1, "Gender", "sex", "Gender"),
    (2, "Database int types", "int", "int types"),
    (3, "Database date/time types", "time.Time", "date/time types"),
    (4, "Database float types", "float64", "float types"),
    (5, "Database string types", "string", "string types"),
    (6, "Database bool types", "bool", "bool types"),
];

fn dictionaries() -> Result<Vec<SeedRow>> {
    Ok(DICTIONARIES
        .iter()
        .map(|&(id, name, kind, description)| {
            SeedRow::new()
                .key("id", id)
                .value("name", name)
                .value("type", kind)
                .value("status", true)
                .value("desc", description)
        })
        .collect())
}

/// `(dictionary_id, value, label)`; `sort` follows `value`
const DICTIONARY_DETAILS: &[(i64, i64, &str)] = &[
    (1, 1, "male"),
    (1, 2, "female"),
    (2, 1, "smallint"),
    (2, 2, "mediumint"),
    (2, 3, "int"),
    (2, 4, "bigint"),
    (3, 1, "date"),
    (3, 2, "time"),
    (3, 3, "year"),
    (3, 4, "datetime"),
    (3, 5, "timestamp"),
    (4, 1, "float"),
    (4, 2, "double"),
    (4, 3, "decimal"),
    (5, 1, "char"),
    (5, 2, "varchar"),
    (5, 3, "tinytext"),
    (5, 4, "text"),
    (5, 5, "mediumtext"),
    (5, 6, "longtext"),
    (6, 1, "tinyint"),
];

fn dictionary_details() -> Result<Vec<SeedRow>> {
    Ok(DICTIONARY_DETAILS
        .iter()
        .map(|&(dictionary_id, value, label)| {
            SeedRow::new()
                .key("sys_dictionary_id", dictionary_id)
                .key("value", value)
                .value("label", label)
                .value("status", true)
                .value("sort", value)
        })
        .collect())
}

fn files() -> Result<Vec<SeedRow>> {
    let uploads = [
        ("10.png", "https://qmplusimg.henrongyi.top/gvalogo.png", "158787308910.png"),
        ("logo.png", "https://qmplusimg.henrongyi.top/1576554439myAvatar.png", "1587973709logo.png"),
    ];

    Ok(uploads
        .into_iter()
        .map(|(name, url, key)| {
            SeedRow::new()
                .key("key", key)
                .value("name", name)
                .value("url", url)
                .value("tag", "png")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ENTITIES;
    use crate::db::schema::converge;
    use crate::db::seed::run_seeds;
    use crate::db::create_test_pool;
    use argon2::{PasswordHash, PasswordVerifier};

    async fn count(pool: &DynDatabasePool, sql: &str) -> i64 {
        sqlx::query_scalar(sql)
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_step_order() {
        let names: Vec<_> = default_steps().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "admin_users",
                "apis",
                "authority_menu_view",
                "authorities",
                "authority_menus",
                "casbin_rules",
                "data_authorities",
                "dictionaries",
                "dictionary_details",
                "files",
                "base_menus",
            ]
        );
    }

    #[test]
    fn test_hash_password_is_salted_argon2id() {
        let first = hash_password(DEFAULT_PASSWORD).unwrap();
        let second = hash_password(DEFAULT_PASSWORD).unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);

        let parsed = PasswordHash::new(&first).unwrap();
        assert!(Argon2::default()
            .verify_password(DEFAULT_PASSWORD.as_bytes(), &parsed)
            .is_ok());
    }

    #[tokio::test]
    async fn test_default_steps_seed_console() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        converge(&pool, ENTITIES).await.unwrap();

        let report = run_seeds(&pool, &default_steps()).await.unwrap();
        assert!(report.rows_inserted() > 0);

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM sys_users").await, 2);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM sys_base_menus").await,
            MENUS.len() as i64
        );
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM authority_menu WHERE authority_id = '888'").await,
            MENUS.len() as i64
        );

        // Every casbin rule points at a seeded api
        let orphans = count(
            &pool,
            "SELECT COUNT(*) FROM casbin_rule c \
             WHERE NOT EXISTS (SELECT 1 FROM sys_apis a WHERE a.path = c.v1 AND a.method = c.v2)",
        )
        .await;
        assert_eq!(orphans, 0);

        let uuids = count(&pool, "SELECT COUNT(DISTINCT uuid) FROM sys_users").await;
        assert_eq!(uuids, 2);
    }

    #[tokio::test]
    async fn test_default_steps_rerun_inserts_nothing() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        converge(&pool, ENTITIES).await.unwrap();

        run_seeds(&pool, &default_steps()).await.unwrap();
        let password: String =
            sqlx::query_scalar("SELECT password FROM sys_users WHERE username = 'admin'")
                .fetch_one(pool.as_sqlite().unwrap())
                .await
                .unwrap();

        let again = run_seeds(&pool, &default_steps()).await.unwrap();
        assert_eq!(again.rows_inserted(), 0);

        // The stored hash is not replaced by a fresh one
        let unchanged: String =
            sqlx::query_scalar("SELECT password FROM sys_users WHERE username = 'admin'")
                .fetch_one(pool.as_sqlite().unwrap())
                .await
                .unwrap();
        assert_eq!(password, unchanged);
    }
}
