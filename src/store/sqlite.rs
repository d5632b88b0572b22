use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::Value;

use super::Store;
use super::schema::{SCHEMA, SEED};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Flow columns hold JSON arrays as text. Anything unparseable (or NULL)
/// reads back as an empty list rather than failing the whole row.
fn parse_flow(text: Option<String>) -> Value {
    text.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

const REQUIREMENT_COLS: &str = "r.id, r.nombre, r.descripcion, r.tipo_id, t.nombre, r.criterios,
       r.prioridad_id, p.nombre, r.estado_id, e.nombre, r.origen, r.condiciones_previas,
       r.proyecto_id, r.fecha_creacion, r.fecha_actualizacion, r.activo
     FROM requisitos r
     JOIN tipos_requisito t ON t.id = r.tipo_id
     LEFT JOIN prioridades p ON p.id = r.prioridad_id
     LEFT JOIN estados_elemento e ON e.id = r.estado_id";

fn requirement_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Requirement> {
    Ok(Requirement {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        type_id: row.get(3)?,
        type_name: row.get(4)?,
        criteria: row.get(5)?,
        priority_id: row.get(6)?,
        priority_name: row.get(7)?,
        status_id: row.get(8)?,
        status_name: row.get(9)?,
        origin: row.get(10)?,
        preconditions: row.get(11)?,
        project_id: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?),
        updated_at: parse_datetime(&row.get::<_, String>(14)?),
        active: row.get(15)?,
    })
}

const USE_CASE_COLS: &str = "c.id, c.nombre, c.descripcion, c.actores, c.precondiciones,
       c.flujo_principal, c.flujos_alternativos, c.postcondiciones, c.requisitos_especiales,
       c.riesgos_consideraciones, c.proyecto_id, c.prioridad_id, p.nombre, c.estado_id, e.nombre,
       c.fecha_creacion, c.fecha_actualizacion, c.activo
     FROM casos_uso c
     LEFT JOIN prioridades p ON p.id = c.prioridad_id
     LEFT JOIN estados_elemento e ON e.id = c.estado_id";

fn use_case_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UseCase> {
    Ok(UseCase {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        actors: row.get(3)?,
        preconditions: row.get(4)?,
        main_flow: parse_flow(row.get(5)?),
        alternate_flows: parse_flow(row.get(6)?),
        postconditions: row.get(7)?,
        special_requirements: row.get(8)?,
        risks: row.get(9)?,
        project_id: row.get(10)?,
        priority_id: row.get(11)?,
        priority_name: row.get(12)?,
        status_id: row.get(13)?,
        status_name: row.get(14)?,
        created_at: parse_datetime(&row.get::<_, String>(15)?),
        updated_at: parse_datetime(&row.get::<_, String>(16)?),
        active: row.get(17)?,
    })
}

const STORY_COLS: &str = "h.id, h.titulo, h.descripcion, h.actor_rol, h.funcionalidad_accion,
       h.beneficio_razon, h.criterios_aceptacion, h.prioridad_id, p.nombre, h.estado_id, e.nombre,
       h.valor_negocio, h.dependencias_relaciones, h.componentes_relacionados,
       h.notas_adicionales, h.proyecto_id, h.fecha_creacion, h.fecha_actualizacion, h.activo
     FROM historias_usuario h
     LEFT JOIN prioridades p ON p.id = h.prioridad_id
     LEFT JOIN estados_elemento e ON e.id = h.estado_id";

fn story_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserStory> {
    Ok(UserStory {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        actor_role: row.get(3)?,
        action: row.get(4)?,
        benefit: row.get(5)?,
        acceptance_criteria: row.get(6)?,
        priority_id: row.get(7)?,
        priority_name: row.get(8)?,
        status_id: row.get(9)?,
        status_name: row.get(10)?,
        business_value: row.get(11)?,
        dependencies: row.get(12)?,
        components: row.get(13)?,
        notes: row.get(14)?,
        project_id: row.get(15)?,
        created_at: parse_datetime(&row.get::<_, String>(16)?),
        updated_at: parse_datetime(&row.get::<_, String>(17)?),
        active: row.get(18)?,
    })
}

fn edge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationEdge> {
    Ok(RelationEdge {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        type_id: row.get(3)?,
        type_name: row.get(4)?,
        target_name: row.get(5)?,
        description: row.get(6)?,
    })
}

fn element_status_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ElementStatus> {
    let tag: String = row.get(2)?;
    let kind = ElementKind::parse(&tag).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown element kind '{tag}'").into(),
        )
    })?;
    Ok(ElementStatus {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        description: row.get(3)?,
        active: row.get(4)?,
    })
}

/// Inserts the edges that survive the skip rules: no self-loops, the
/// destination must exist and be active, and the relation type must exist.
/// Returns how many edges were actually created.
fn insert_requirement_relations(
    tx: &Transaction<'_>,
    source_id: i64,
    relations: &[RelationInput],
) -> Result<usize> {
    let mut created = 0;
    for rel in relations {
        if rel.target_id == source_id {
            continue;
        }
        let target: Option<i64> = tx
            .query_row(
                "SELECT id FROM requisitos WHERE id = ?1 AND activo = 1",
                params![rel.target_id],
                |row| row.get(0),
            )
            .optional()?;
        let kind: Option<i64> = tx
            .query_row(
                "SELECT id FROM tipos_relacion_requisito WHERE id = ?1",
                params![rel.type_id],
                |row| row.get(0),
            )
            .optional()?;
        if target.is_none() || kind.is_none() {
            continue;
        }
        tx.execute(
            "INSERT INTO relaciones_requisitos
                 (requisito_origen_id, requisito_destino_id, tipo_relacion_id, descripcion, fecha_creacion)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                source_id,
                rel.target_id,
                rel.type_id,
                rel.description,
                format_datetime(&Utc::now()),
            ],
        )?;
        created += 1;
    }
    Ok(created)
}

/// Use-case flavor of the same skip rules; the relation type must be active.
fn insert_use_case_relations(
    tx: &Transaction<'_>,
    source_id: i64,
    relations: &[RelationInput],
) -> Result<usize> {
    let mut created = 0;
    for rel in relations {
        if rel.target_id == source_id {
            continue;
        }
        let target: Option<i64> = tx
            .query_row(
                "SELECT id FROM casos_uso WHERE id = ?1 AND activo = 1",
                params![rel.target_id],
                |row| row.get(0),
            )
            .optional()?;
        let kind: Option<i64> = tx
            .query_row(
                "SELECT id FROM tipos_relacion_cu WHERE id = ?1 AND activo = 1",
                params![rel.type_id],
                |row| row.get(0),
            )
            .optional()?;
        if target.is_none() || kind.is_none() {
            continue;
        }
        tx.execute(
            "INSERT INTO relaciones_casos_uso
                 (caso_uso_origen_id, caso_uso_destino_id, tipo_relacion_id, descripcion, fecha_creacion)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                source_id,
                rel.target_id,
                rel.type_id,
                rel.description,
                format_datetime(&Utc::now()),
            ],
        )?;
        created += 1;
    }
    Ok(created)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(SEED)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO usuarios (id, username, created_at, updated_at, activo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
                user.active,
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, created_at, updated_at, activo
             FROM usuarios WHERE id = ?1 AND activo = 1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    active: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, created_at, updated_at, activo
             FROM usuarios WHERE username = ?1 AND activo = 1",
            params![username],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                    active: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, created_at, updated_at, activo
             FROM usuarios WHERE activo = 1 ORDER BY username",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
                updated_at: parse_datetime(&row.get::<_, String>(3)?),
                active: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
                token.last_used_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("token_lookup") => {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Token {
                id: row.get(0)?,
                token_hash: row.get(1)?,
                token_lookup: row.get(2)?,
                is_admin: row.get(3)?,
                user_id: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Simple catalog operations; the table is picked by `CatalogKind`

    fn create_catalog_item(
        &self,
        kind: CatalogKind,
        name: &str,
        description: &str,
    ) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "INSERT INTO {} (nombre, descripcion) VALUES (?1, ?2)",
                kind.table()
            ),
            params![name, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_catalog_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, nombre, descripcion, activo FROM {} WHERE activo = 1 ORDER BY nombre",
            kind.table()
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(CatalogItem {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                active: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_catalog_item(&self, kind: CatalogKind, id: i64) -> Result<Option<CatalogItem>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT id, nombre, descripcion, activo FROM {} WHERE id = ?1 AND activo = 1",
                kind.table()
            ),
            params![id],
            |row| {
                Ok(CatalogItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    active: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_catalog_item(
        &self,
        kind: CatalogKind,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let rows = self.conn().execute(
            &format!(
                "UPDATE {} SET nombre = COALESCE(?1, nombre),
                     descripcion = COALESCE(?2, descripcion)
                 WHERE id = ?3 AND activo = 1",
                kind.table()
            ),
            params![name, description, id],
        )?;
        Ok(rows > 0)
    }

    fn disable_catalog_item(&self, kind: CatalogKind, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            &format!(
                "UPDATE {} SET activo = 0 WHERE id = ?1 AND activo = 1",
                kind.table()
            ),
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Priority operations

    fn create_priority(&self, name: &str, level: i64, description: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO prioridades (nombre, nivel, descripcion) VALUES (?1, ?2, ?3)",
            params![name, level, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_priorities(&self) -> Result<Vec<Priority>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, nombre, nivel, descripcion, activo
             FROM prioridades WHERE activo = 1 ORDER BY nivel",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Priority {
                id: row.get(0)?,
                name: row.get(1)?,
                level: row.get(2)?,
                description: row.get(3)?,
                active: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_priority(&self, id: i64) -> Result<Option<Priority>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, nivel, descripcion, activo
             FROM prioridades WHERE id = ?1 AND activo = 1",
            params![id],
            |row| {
                Ok(Priority {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    level: row.get(2)?,
                    description: row.get(3)?,
                    active: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_priority(
        &self,
        id: i64,
        name: Option<&str>,
        level: Option<i64>,
        description: Option<&str>,
    ) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE prioridades SET nombre = COALESCE(?1, nombre),
                 nivel = COALESCE(?2, nivel),
                 descripcion = COALESCE(?3, descripcion)
             WHERE id = ?4 AND activo = 1",
            params![name, level, description, id],
        )?;
        Ok(rows > 0)
    }

    fn disable_priority(&self, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE prioridades SET activo = 0 WHERE id = ?1 AND activo = 1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Project status operations

    fn create_project_status(&self, name: &str, order: i64, description: &str) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO estados_proyecto (nombre, orden, descripcion) VALUES (?1, ?2, ?3)",
            params![name, order, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_project_statuses(&self) -> Result<Vec<ProjectStatus>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, nombre, orden, descripcion, activo
             FROM estados_proyecto WHERE activo = 1 ORDER BY orden",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ProjectStatus {
                id: row.get(0)?,
                name: row.get(1)?,
                order: row.get(2)?,
                description: row.get(3)?,
                active: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_project_status(&self, id: i64) -> Result<Option<ProjectStatus>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, orden, descripcion, activo
             FROM estados_proyecto WHERE id = ?1 AND activo = 1",
            params![id],
            |row| {
                Ok(ProjectStatus {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    order: row.get(2)?,
                    description: row.get(3)?,
                    active: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_project_status(
        &self,
        id: i64,
        name: Option<&str>,
        order: Option<i64>,
        description: Option<&str>,
    ) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE estados_proyecto SET nombre = COALESCE(?1, nombre),
                 orden = COALESCE(?2, orden),
                 descripcion = COALESCE(?3, descripcion)
             WHERE id = ?4 AND activo = 1",
            params![name, order, description, id],
        )?;
        Ok(rows > 0)
    }

    fn disable_project_status(&self, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE estados_proyecto SET activo = 0 WHERE id = ?1 AND activo = 1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Element status operations

    fn create_element_status(
        &self,
        name: &str,
        kind: ElementKind,
        description: &str,
    ) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO estados_elemento (nombre, tipo, descripcion) VALUES (?1, ?2, ?3)",
            params![name, kind.as_str(), description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_element_statuses(&self) -> Result<Vec<ElementStatus>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, nombre, tipo, descripcion, activo
             FROM estados_elemento WHERE activo = 1 ORDER BY tipo, nombre",
        )?;

        let rows = stmt.query_map([], element_status_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_element_status(&self, id: i64) -> Result<Option<ElementStatus>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, tipo, descripcion, activo
             FROM estados_elemento WHERE id = ?1 AND activo = 1",
            params![id],
            element_status_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_element_status_for_kind(
        &self,
        id: i64,
        kind: ElementKind,
    ) -> Result<Option<ElementStatus>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, tipo, descripcion, activo
             FROM estados_elemento WHERE id = ?1 AND tipo = ?2 AND activo = 1",
            params![id, kind.as_str()],
            element_status_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn default_element_status(&self, kind: ElementKind) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id FROM estados_elemento
             WHERE tipo = ?1 AND activo = 1 ORDER BY id LIMIT 1",
            params![kind.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_element_status(
        &self,
        id: i64,
        name: Option<&str>,
        kind: Option<ElementKind>,
        description: Option<&str>,
    ) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE estados_elemento SET nombre = COALESCE(?1, nombre),
                 tipo = COALESCE(?2, tipo),
                 descripcion = COALESCE(?3, descripcion)
             WHERE id = ?4 AND activo = 1",
            params![name, kind.map(|k| k.as_str()), description, id],
        )?;
        Ok(rows > 0)
    }

    fn disable_element_status(&self, id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE estados_elemento SET activo = 0 WHERE id = ?1 AND activo = 1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    // Project operations

    fn create_project(
        &self,
        name: &str,
        description: &str,
        status: &str,
        user_id: &str,
    ) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO proyectos (nombre, descripcion, estado, usuario_id, fecha_creacion, fecha_actualizacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![name, description, status, user_id, format_datetime(&Utc::now())],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, nombre, descripcion, estado, usuario_id, fecha_creacion, fecha_actualizacion, activo
             FROM proyectos WHERE usuario_id = ?1 AND activo = 1
             ORDER BY fecha_creacion DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                status: row.get(3)?,
                user_id: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
                active: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_project(&self, id: i64, user_id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, descripcion, estado, usuario_id, fecha_creacion, fecha_actualizacion, activo
             FROM proyectos WHERE id = ?1 AND usuario_id = ?2 AND activo = 1",
            params![id, user_id],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    status: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    active: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_active_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, nombre, descripcion, estado, usuario_id, fecha_creacion, fecha_actualizacion, activo
             FROM proyectos WHERE id = ?1 AND activo = 1",
            params![id],
            |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    status: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    updated_at: parse_datetime(&row.get::<_, String>(6)?),
                    active: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        self.conn().execute(
            "UPDATE proyectos SET nombre = ?1, descripcion = ?2, estado = ?3, fecha_actualizacion = ?4
             WHERE id = ?5 AND usuario_id = ?6",
            params![
                project.name,
                project.description,
                project.status,
                format_datetime(&Utc::now()),
                project.id,
                project.user_id,
            ],
        )?;
        Ok(())
    }

    fn soft_delete_project(&self, id: i64, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE proyectos SET activo = 0, fecha_actualizacion = ?1
             WHERE id = ?2 AND usuario_id = ?3 AND activo = 1",
            params![format_datetime(&Utc::now()), id, user_id],
        )?;
        Ok(rows > 0)
    }

    // Requirement operations

    fn create_requirement(
        &self,
        req: &NewRequirement,
        relations: &[RelationInput],
    ) -> Result<(i64, usize)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO requisitos
                 (nombre, descripcion, tipo_id, criterios, prioridad_id, estado_id,
                  origen, condiciones_previas, proyecto_id, fecha_creacion, fecha_actualizacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                req.name,
                req.description,
                req.type_id,
                req.criteria,
                req.priority_id,
                req.status_id,
                req.origin,
                req.preconditions,
                req.project_id,
                format_datetime(&Utc::now()),
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = insert_requirement_relations(&tx, id, relations)?;

        tx.commit()?;
        Ok((id, created))
    }

    fn get_requirement(&self, id: i64) -> Result<Option<Requirement>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {REQUIREMENT_COLS} WHERE r.id = ?1 AND r.activo = 1"),
            params![id],
            requirement_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_requirements(&self, project_id: i64) -> Result<Vec<Requirement>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REQUIREMENT_COLS}
             WHERE r.proyecto_id = ?1 AND r.activo = 1
             ORDER BY r.fecha_creacion DESC, r.id DESC"
        ))?;

        let rows = stmt.query_map(params![project_id], requirement_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_requirement(
        &self,
        req: &Requirement,
        relations: Option<&[RelationInput]>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE requisitos SET nombre = ?1, descripcion = ?2, tipo_id = ?3, criterios = ?4,
                 prioridad_id = ?5, estado_id = ?6, origen = ?7, condiciones_previas = ?8,
                 fecha_actualizacion = ?9
             WHERE id = ?10",
            params![
                req.name,
                req.description,
                req.type_id,
                req.criteria,
                req.priority_id,
                req.status_id,
                req.origin,
                req.preconditions,
                format_datetime(&Utc::now()),
                req.id,
            ],
        )?;

        let mut created = 0;
        if let Some(rels) = relations {
            tx.execute(
                "DELETE FROM relaciones_requisitos WHERE requisito_origen_id = ?1",
                params![req.id],
            )?;
            created = insert_requirement_relations(&tx, req.id, rels)?;
        }

        tx.commit()?;
        Ok(created)
    }

    fn soft_delete_requirement(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE requisitos SET activo = 0, fecha_actualizacion = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        tx.execute(
            "DELETE FROM relaciones_requisitos
             WHERE requisito_origen_id = ?1 OR requisito_destino_id = ?1",
            params![id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_requirement_relations(&self, id: i64) -> Result<Vec<RelationEdge>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT rr.id, rr.requisito_origen_id, rr.requisito_destino_id, rr.tipo_relacion_id,
                    tr.nombre, rd.nombre, rr.descripcion
             FROM relaciones_requisitos rr
             LEFT JOIN tipos_relacion_requisito tr ON tr.id = rr.tipo_relacion_id
             LEFT JOIN requisitos rd ON rd.id = rr.requisito_destino_id
             WHERE rr.requisito_origen_id = ?1
             ORDER BY rr.id",
        )?;

        let rows = stmt.query_map(params![id], edge_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Use-case operations

    fn create_use_case(
        &self,
        use_case: &NewUseCase,
        relations: &[RelationInput],
    ) -> Result<(i64, usize)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO casos_uso
                 (nombre, descripcion, actores, precondiciones, flujo_principal,
                  flujos_alternativos, postcondiciones, requisitos_especiales,
                  riesgos_consideraciones, proyecto_id, prioridad_id, estado_id,
                  fecha_creacion, fecha_actualizacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                use_case.name,
                use_case.description,
                use_case.actors,
                use_case.preconditions,
                serde_json::to_string(&use_case.main_flow)?,
                serde_json::to_string(&use_case.alternate_flows)?,
                use_case.postconditions,
                use_case.special_requirements,
                use_case.risks,
                use_case.project_id,
                use_case.priority_id,
                use_case.status_id,
                format_datetime(&Utc::now()),
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = insert_use_case_relations(&tx, id, relations)?;

        tx.commit()?;
        Ok((id, created))
    }

    fn get_use_case(&self, id: i64) -> Result<Option<UseCase>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USE_CASE_COLS} WHERE c.id = ?1 AND c.activo = 1"),
            params![id],
            use_case_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_use_cases(&self, project_id: i64) -> Result<Vec<UseCase>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USE_CASE_COLS}
             WHERE c.proyecto_id = ?1 AND c.activo = 1
             ORDER BY c.fecha_creacion DESC, c.id DESC"
        ))?;

        let rows = stmt.query_map(params![project_id], use_case_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_use_case(
        &self,
        use_case: &UseCase,
        relations: Option<&[RelationInput]>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE casos_uso SET nombre = ?1, descripcion = ?2, actores = ?3,
                 precondiciones = ?4, flujo_principal = ?5, flujos_alternativos = ?6,
                 postcondiciones = ?7, requisitos_especiales = ?8, riesgos_consideraciones = ?9,
                 prioridad_id = ?10, estado_id = ?11, fecha_actualizacion = ?12
             WHERE id = ?13",
            params![
                use_case.name,
                use_case.description,
                use_case.actors,
                use_case.preconditions,
                serde_json::to_string(&use_case.main_flow)?,
                serde_json::to_string(&use_case.alternate_flows)?,
                use_case.postconditions,
                use_case.special_requirements,
                use_case.risks,
                use_case.priority_id,
                use_case.status_id,
                format_datetime(&Utc::now()),
                use_case.id,
            ],
        )?;

        let mut created = 0;
        if let Some(rels) = relations {
            tx.execute(
                "DELETE FROM relaciones_casos_uso WHERE caso_uso_origen_id = ?1",
                params![use_case.id],
            )?;
            created = insert_use_case_relations(&tx, use_case.id, rels)?;
        }

        tx.commit()?;
        Ok(created)
    }

    fn soft_delete_use_case(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE casos_uso SET activo = 0, fecha_actualizacion = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        tx.execute(
            "DELETE FROM relaciones_casos_uso
             WHERE caso_uso_origen_id = ?1 OR caso_uso_destino_id = ?1",
            params![id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_use_case_relations(&self, id: i64) -> Result<Vec<RelationEdge>> {
        let conn = self.conn();
        // Inner join on the destination hides edges to soft-deleted use cases
        let mut stmt = conn.prepare(
            "SELECT rc.id, rc.caso_uso_origen_id, rc.caso_uso_destino_id, rc.tipo_relacion_id,
                    tr.nombre, cd.nombre, rc.descripcion
             FROM relaciones_casos_uso rc
             LEFT JOIN tipos_relacion_cu tr ON tr.id = rc.tipo_relacion_id
             JOIN casos_uso cd ON cd.id = rc.caso_uso_destino_id AND cd.activo = 1
             WHERE rc.caso_uso_origen_id = ?1
             ORDER BY rc.id",
        )?;

        let rows = stmt.query_map(params![id], edge_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // User-story operations

    fn create_story(
        &self,
        story: &NewUserStory,
        estimations: &[EstimationInput],
    ) -> Result<(i64, Vec<StoryEstimation>)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO historias_usuario
                 (titulo, descripcion, actor_rol, funcionalidad_accion, beneficio_razon,
                  criterios_aceptacion, prioridad_id, estado_id, valor_negocio,
                  dependencias_relaciones, componentes_relacionados, notas_adicionales,
                  proyecto_id, fecha_creacion, fecha_actualizacion)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
            params![
                story.title,
                story.description,
                story.actor_role,
                story.action,
                story.benefit,
                story.acceptance_criteria,
                story.priority_id,
                story.status_id,
                story.business_value,
                story.dependencies,
                story.components,
                story.notes,
                story.project_id,
                format_datetime(&Utc::now()),
            ],
        )?;
        let id = tx.last_insert_rowid();

        let mut created = Vec::new();
        for est in estimations {
            let type_name: Option<String> = tx
                .query_row(
                    "SELECT nombre FROM tipos_estimacion WHERE id = ?1 AND activo = 1",
                    params![est.type_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(type_name) = type_name else {
                continue;
            };
            tx.execute(
                "INSERT INTO historias_estimaciones
                     (historia_id, tipo_estimacion_id, valor, fecha_creacion, fecha_actualizacion)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![id, est.type_id, est.value, format_datetime(&Utc::now())],
            )?;
            created.push(StoryEstimation {
                id: tx.last_insert_rowid(),
                story_id: id,
                type_id: est.type_id,
                type_name,
                value: est.value,
            });
        }

        tx.commit()?;
        Ok((id, created))
    }

    fn get_story(&self, id: i64) -> Result<Option<UserStory>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {STORY_COLS} WHERE h.id = ?1 AND h.activo = 1"),
            params![id],
            story_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_stories(&self, project_id: i64) -> Result<Vec<UserStory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STORY_COLS}
             WHERE h.proyecto_id = ?1 AND h.activo = 1
             ORDER BY h.fecha_creacion DESC, h.id DESC"
        ))?;

        let rows = stmt.query_map(params![project_id], story_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_story(
        &self,
        story: &UserStory,
        estimations: Option<&[EstimationInput]>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE historias_usuario SET titulo = ?1, descripcion = ?2, actor_rol = ?3,
                 funcionalidad_accion = ?4, beneficio_razon = ?5, criterios_aceptacion = ?6,
                 prioridad_id = ?7, estado_id = ?8, valor_negocio = ?9,
                 dependencias_relaciones = ?10, componentes_relacionados = ?11,
                 notas_adicionales = ?12, fecha_actualizacion = ?13
             WHERE id = ?14",
            params![
                story.title,
                story.description,
                story.actor_role,
                story.action,
                story.benefit,
                story.acceptance_criteria,
                story.priority_id,
                story.status_id,
                story.business_value,
                story.dependencies,
                story.components,
                story.notes,
                format_datetime(&Utc::now()),
                story.id,
            ],
        )?;

        let mut applied = 0;
        if let Some(ests) = estimations {
            // Deactivate everything first; valid entries reactivate their row
            tx.execute(
                "UPDATE historias_estimaciones SET activo = 0, fecha_actualizacion = ?1
                 WHERE historia_id = ?2",
                params![format_datetime(&Utc::now()), story.id],
            )?;

            for est in ests {
                let known: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM tipos_estimacion WHERE id = ?1 AND activo = 1",
                        params![est.type_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if known.is_none() {
                    continue;
                }

                let existing: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM historias_estimaciones
                         WHERE historia_id = ?1 AND tipo_estimacion_id = ?2
                         ORDER BY id LIMIT 1",
                        params![story.id, est.type_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                match existing {
                    Some(row_id) => {
                        tx.execute(
                            "UPDATE historias_estimaciones
                             SET valor = ?1, activo = 1, fecha_actualizacion = ?2
                             WHERE id = ?3",
                            params![est.value, format_datetime(&Utc::now()), row_id],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO historias_estimaciones
                                 (historia_id, tipo_estimacion_id, valor, fecha_creacion, fecha_actualizacion)
                             VALUES (?1, ?2, ?3, ?4, ?4)",
                            params![story.id, est.type_id, est.value, format_datetime(&Utc::now())],
                        )?;
                    }
                }
                applied += 1;
            }
        }

        tx.commit()?;
        Ok(applied)
    }

    fn soft_delete_story(&self, id: i64) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE historias_usuario SET activo = 0, fecha_actualizacion = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        tx.execute(
            "DELETE FROM historias_estimaciones WHERE historia_id = ?1",
            params![id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn list_story_estimations(&self, story_id: i64) -> Result<Vec<StoryEstimation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT he.id, he.historia_id, he.tipo_estimacion_id, te.nombre, he.valor
             FROM historias_estimaciones he
             JOIN tipos_estimacion te ON te.id = he.tipo_estimacion_id
             WHERE he.historia_id = ?1 AND he.activo = 1
             ORDER BY he.id",
        )?;

        let rows = stmt.query_map(params![story_id], |row| {
            Ok(StoryEstimation {
                id: row.get(0)?,
                story_id: row.get(1)?,
                type_id: row.get(2)?,
                type_name: row.get(3)?,
                value: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}
